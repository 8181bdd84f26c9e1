//! Ensures that session handling (login / logout) works as expected.

use futures::future::{FutureExt, LocalBoxFuture};
use thirtyfour::By;

use super::{CaseFn, Group, TestCase};
use crate::error::{ensure, E2eResult};
use crate::page::{dom, Bookreader};

pub(super) fn cases() -> Vec<TestCase> {
    let case = |name, description, run: CaseFn| TestCase::new(Group::Session, name, description, run);

    vec![
        case("toggle_login", "The login link opens the login lightbox", toggle_login),
        case("cancel_login", "Cancel closes the login form", cancel_login),
        case(
            "submit_login",
            "Valid login closes the form and shows the logout and user controls",
            submit_login,
        ),
        case(
            "login_insists_on_username_and_password",
            "Login only works with both username and password",
            login_insists_on_username_and_password,
        ),
        case(
            "login_error_hides_on_cancel",
            "The login error is hidden when the form is cancelled",
            login_error_hides_on_cancel,
        ),
        case(
            "login_error_hides_on_valid_login",
            "The login error is hidden after a correct submission",
            login_error_hides_on_valid_login,
        ),
        case("logout", "The logout link restores the logged-out controls", logout),
    ]
}

/// User controls must stay hidden while logged out
async fn expect_logged_out(page: &Bookreader) -> E2eResult<()> {
    page.expect_visible(By::Id(dom::LOGIN_INFO), "login control").await?;
    page.expect_hidden(By::Css(dom::USER_INFO), "user info").await?;
    page.expect_hidden(By::Id(dom::LOGOUT_LINK), "logout link").await
}

/// Submit the open login form with a blank field and wait for the error
async fn submit_incomplete(page: &Bookreader, username: &str, password: &str) -> E2eResult<()> {
    page.submit_login(username, password).await?;
    page.wait_visible(By::Id(dom::LOGIN_ERROR), "login error").await
}

fn toggle_login(page: &Bookreader) -> LocalBoxFuture<'_, E2eResult<()>> {
    async move {
        page.expect_hidden(By::Id(dom::LOGIN_FORM), "login lightbox").await?;
        page.open_login().await?;
        page.expect_visible(By::Id(dom::USERNAME_INPUT), "username input").await?;
        page.expect_visible(By::Id(dom::PASSWORD_INPUT), "password input").await?;
        page.expect_hidden(By::Id(dom::LOGIN_ERROR), "login error").await
    }
    .boxed_local()
}

fn cancel_login(page: &Bookreader) -> LocalBoxFuture<'_, E2eResult<()>> {
    async move {
        page.open_login().await?;
        page.cancel_login().await?;
        expect_logged_out(page).await
    }
    .boxed_local()
}

fn submit_login(page: &Bookreader) -> LocalBoxFuture<'_, E2eResult<()>> {
    async move {
        page.login().await?;

        page.expect_hidden(By::Id(dom::LOGIN_INFO), "login control").await?;
        page.expect_visible(By::Css(dom::USER_INFO), "user info").await?;
        page.expect_visible(By::Id(dom::LOGOUT_LINK), "logout link").await?;

        let shown = page.session().text(By::Id(dom::USERNAME)).await?;
        let expected = &page.account().username;
        ensure(shown.trim() == expected.as_str(), || {
            format!("user info shows '{shown}', expected '{expected}'")
        })
    }
    .boxed_local()
}

fn login_insists_on_username_and_password(page: &Bookreader) -> LocalBoxFuture<'_, E2eResult<()>> {
    async move {
        let account = page.account().clone();
        page.open_login().await?;

        submit_incomplete(page, "", &account.password).await?;
        expect_logged_out(page).await?;

        submit_incomplete(page, &account.username, "").await?;
        expect_logged_out(page).await?;

        submit_incomplete(page, "", "").await?;
        page.expect_visible(By::Id(dom::LOGIN_FORM), "login lightbox").await?;
        expect_logged_out(page).await
    }
    .boxed_local()
}

fn login_error_hides_on_cancel(page: &Bookreader) -> LocalBoxFuture<'_, E2eResult<()>> {
    async move {
        page.open_login().await?;
        submit_incomplete(page, "", "").await?;
        page.cancel_login().await?;

        page.open_login().await?;
        page.expect_hidden(By::Id(dom::LOGIN_ERROR), "login error").await
    }
    .boxed_local()
}

fn login_error_hides_on_valid_login(page: &Bookreader) -> LocalBoxFuture<'_, E2eResult<()>> {
    async move {
        let account = page.account().clone();
        page.open_login().await?;
        submit_incomplete(page, &account.username, "").await?;

        page.submit_login(&account.username, &account.password).await?;
        page.wait_visible(By::Id(dom::LOGOUT_LINK), "logout link").await?;
        page.wait_hidden(By::Id(dom::LOGIN_ERROR), "login error").await
    }
    .boxed_local()
}

fn logout(page: &Bookreader) -> LocalBoxFuture<'_, E2eResult<()>> {
    async move {
        page.login().await?;
        page.logout().await?;
        expect_logged_out(page).await
    }
    .boxed_local()
}
