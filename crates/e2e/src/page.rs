//! Page object for the bookreader application

use std::future::Future;

use thirtyfour::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::browser::BrowserSession;
use crate::error::{ensure, E2eError, E2eResult};
use crate::wait::{wait_until, WaitPolicy};

/// Element ids and selectors the app renders
pub mod dom {
    pub const ABOUT: &str = "aboutContainer";
    pub const COLOPHON: &str = "colophonContainer";
    pub const HELP: &str = "helpContainer";
    pub const OOPS: &str = "oops";
    pub const WORKING: &str = "working";

    pub const LOGIN_LINK: &str = ".loginLink";
    pub const LOGIN_INFO: &str = "loginInfo";
    pub const LOGOUT_LINK: &str = "logoutLink";
    pub const USER_INFO: &str = ".userInfo";
    pub const USERNAME: &str = "username";
    pub const LOGIN_FORM: &str = "loginForm";
    pub const USERNAME_INPUT: &str = "usernameInput";
    pub const PASSWORD_INPUT: &str = "passwordInput";
    pub const LOGIN_ERROR: &str = "loginFormError";
    pub const CANCEL_LOGIN: &str = "cancelLogin";

    pub const CHAPTER: &str = "chapter";
    pub const TEXT_BLOCK: &str = "#chapter .textBlock";
    pub const TAG_LINK: &str = "#chapter .tagLink";
    pub const PREVIOUS: &str = "previousLink";
    pub const NEXT: &str = "nextLink";
    pub const BOTTOM_NAV: &str = "bottomNav";

    pub const ANNOTATIONS: &str = "annotations";
    pub const CLOSE_ANNOTATIONS: &str = "closeAnnotations";
    pub const NEW_COMMENT_CONTAINER: &str = "newCommentContainer";
    pub const ANNOTATE_BUTTON: &str = "annotateButton";
    pub const NEW_COMMENT_FORM: &str = "newCommentForm";
    pub const NEW_COMMENT_CONTENT: &str = "newCommentContent";
    pub const SUBMIT_ANNOTATION: &str = "submitAnnotation";
    pub const CANCEL_ANNOTATION: &str = "cancelAnnotation";
    pub const NEW_COMMENT_ERROR: &str = "newCommentFormError";
    pub const FETCHING: &str = "fetchingCommentTags";
    pub const NOTHING_TAGGED_LOGGED_IN: &str = "nothingTaggedLoggedIn";
    pub const COMMENT_VALUES: &str = "commentTagValues";
    /// One rendered comment inside the values container
    pub const COMMENT: &str = "#commentTagValues > div";
    pub const DELETE_COMMENT: &str = ".deleteAnnotation";
}

/// Credentials the UI logs in with
#[derive(Debug, Clone)]
pub struct Account {
    pub username: String,
    pub password: String,
}

/// The bookreader as seen through one browser session.
///
/// This is the context every case receives. It owns the session so the
/// runner can hand it back for closing once the suite is done.
pub struct Bookreader {
    session: BrowserSession,
    base_url: String,
    account: Account,
    wait: WaitPolicy,
    cancel: CancellationToken,
}

impl Bookreader {
    pub fn new(
        session: BrowserSession,
        base_url: impl Into<String>,
        account: Account,
        wait: WaitPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session,
            base_url: base_url.into(),
            account,
            wait,
            cancel,
        }
    }

    pub fn session(&self) -> &BrowserSession {
        &self.session
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn into_session(self) -> BrowserSession {
        self.session
    }

    /// Load the app at its root URL
    pub async fn open(&self) -> E2eResult<()> {
        info!("Opening {}", self.base_url);
        self.session.goto(&self.base_url).await
    }

    /// Logged out, about pane shown, annotation lightbox closed.
    pub async fn reset_baseline(&self) -> E2eResult<()> {
        debug!("Resetting to baseline");
        self.session.clear_storage().await?;
        self.open().await?;
        self.wait_visible(By::Id(dom::ABOUT), "about pane").await?;
        ensure(!self.is_visible(By::Id(dom::ANNOTATIONS)).await?, || {
            "annotation lightbox open after reset".into()
        })?;
        ensure(self.is_visible(By::Id(dom::LOGIN_INFO)).await?, || {
            "login control hidden after reset".into()
        })
    }

    pub async fn is_visible(&self, by: By) -> E2eResult<bool> {
        self.session.is_displayed(by).await
    }

    pub async fn expect_visible(&self, by: By, what: &str) -> E2eResult<()> {
        let visible = self.is_visible(by).await?;
        ensure(visible, || format!("{what} should be visible"))
    }

    pub async fn expect_hidden(&self, by: By, what: &str) -> E2eResult<()> {
        let visible = self.is_visible(by).await?;
        ensure(!visible, || format!("{what} should be hidden"))
    }

    /// Poll `probe` under this page's wait policy and cancellation
    pub async fn wait_for<F, Fut>(&self, what: &str, probe: F) -> E2eResult<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = E2eResult<bool>>,
    {
        wait_until(what, self.wait, &self.cancel, probe).await
    }

    pub async fn wait_visible(&self, by: By, what: &str) -> E2eResult<()> {
        let session = &self.session;
        wait_until(&format!("{what} visible"), self.wait, &self.cancel, move || {
            session.is_displayed(by.clone())
        })
        .await
    }

    pub async fn wait_hidden(&self, by: By, what: &str) -> E2eResult<()> {
        let session = &self.session;
        wait_until(&format!("{what} hidden"), self.wait, &self.cancel, move || {
            let by = by.clone();
            async move { Ok(!session.is_displayed(by).await?) }
        })
        .await
    }

    // Session

    pub async fn open_login(&self) -> E2eResult<()> {
        self.session.click(By::Css(dom::LOGIN_LINK)).await?;
        self.wait_visible(By::Id(dom::LOGIN_FORM), "login lightbox").await
    }

    /// Fill in and submit the login form (which must be open)
    pub async fn submit_login(&self, username: &str, password: &str) -> E2eResult<()> {
        self.session.fill(By::Id(dom::USERNAME_INPUT), username).await?;
        self.session.fill(By::Id(dom::PASSWORD_INPUT), password).await?;
        self.session.press_enter(By::Id(dom::PASSWORD_INPUT)).await
    }

    pub async fn cancel_login(&self) -> E2eResult<()> {
        self.session.click(By::Id(dom::CANCEL_LOGIN)).await?;
        self.wait_hidden(By::Id(dom::LOGIN_FORM), "login lightbox").await
    }

    /// Log in with the configured account and wait for the user controls
    pub async fn login(&self) -> E2eResult<()> {
        self.open_login().await?;
        let Account { username, password } = &self.account;
        self.submit_login(username, password).await?;
        self.wait_visible(By::Id(dom::LOGOUT_LINK), "logout link").await?;
        self.wait_hidden(By::Id(dom::LOGIN_FORM), "login lightbox").await
    }

    pub async fn logout(&self) -> E2eResult<()> {
        self.session.click(By::Id(dom::LOGOUT_LINK)).await?;
        self.wait_visible(By::Id(dom::LOGIN_INFO), "login control").await
    }

    // Reader

    /// Open a chapter from the menu and wait for its blocks
    pub async fn open_chapter(&self, name: &str) -> E2eResult<()> {
        // The menu lives in a collapsed dropdown, so click through script.
        let link = By::Css(format!(".chapterLink[href='#{name}']"));
        self.session.script_click(link).await?;
        self.wait_chapter(name).await
    }

    pub async fn wait_chapter(&self, name: &str) -> E2eResult<()> {
        self.wait_visible(By::Id(dom::CHAPTER), &format!("chapter '{name}'"))
            .await?;
        self.wait_visible(By::Css(dom::TEXT_BLOCK), "chapter text").await
    }

    /// Target of a prev/next button, e.g. `#prologue`
    pub async fn nav_target(&self, id: &str) -> E2eResult<Option<String>> {
        let href = self.session.attr(By::Id(id), "href").await?;
        Ok(href.map(|h| match h.rfind('#') {
            Some(at) => h[at..].to_string(),
            None => h,
        }))
    }

    /// Wait until a prev/next button points at `target`
    pub async fn wait_nav_target(&self, id: &str, target: &str) -> E2eResult<()> {
        let what = format!("#{id} pointing at {target}");
        wait_until(&what, self.wait, &self.cancel, move || async move {
            Ok(self.nav_target(id).await?.as_deref() == Some(target))
        })
        .await
    }

    /// Participant counter text next to the first block
    pub async fn first_block_counter(&self) -> E2eResult<String> {
        self.session
            .text(By::Css("#chapter .tagLink + span"))
            .await
            .map(|t| t.trim().to_string())
    }

    // Annotations

    /// Open the annotation lightbox of the first block in the chapter
    pub async fn open_annotations(&self) -> E2eResult<()> {
        self.session.click(By::Css(dom::TAG_LINK)).await?;
        self.wait_visible(By::Id(dom::ANNOTATIONS), "annotation lightbox")
            .await?;
        self.wait_hidden(By::Id(dom::FETCHING), "comment fetch").await
    }

    pub async fn close_annotations(&self) -> E2eResult<()> {
        self.session.click(By::Id(dom::CLOSE_ANNOTATIONS)).await?;
        self.wait_hidden(By::Id(dom::ANNOTATIONS), "annotation lightbox")
            .await
    }

    /// Log in, load `chapter` and open the first block's annotations
    pub async fn annotate_first_block(&self, chapter: &str) -> E2eResult<()> {
        self.login().await?;
        self.open_chapter(chapter).await?;
        self.open_annotations().await
    }

    pub async fn start_comment(&self) -> E2eResult<()> {
        self.session.click(By::Id(dom::ANNOTATE_BUTTON)).await?;
        self.wait_visible(By::Id(dom::NEW_COMMENT_FORM), "comment form")
            .await
    }

    /// Type into the comment form and press submit. Does not wait.
    pub async fn submit_comment(&self, text: &str) -> E2eResult<()> {
        self.session.fill(By::Id(dom::NEW_COMMENT_CONTENT), text).await?;
        self.session.click(By::Id(dom::SUBMIT_ANNOTATION)).await
    }

    /// Submit a comment and wait until it shows up in the values container
    pub async fn add_comment(&self, text: &str) -> E2eResult<()> {
        self.start_comment().await?;
        self.submit_comment(text).await?;
        self.wait_for_comment(text).await
    }

    pub async fn cancel_comment(&self) -> E2eResult<()> {
        self.session.click(By::Id(dom::CANCEL_ANNOTATION)).await?;
        self.wait_visible(By::Id(dom::ANNOTATE_BUTTON), "annotate button")
            .await
    }

    /// Text of every rendered comment, newest first
    pub async fn comment_texts(&self) -> E2eResult<Vec<String>> {
        let mut texts = Vec::new();
        for elem in self.session.find_all(By::Css(dom::COMMENT)).await? {
            texts.push(elem.text().await?);
        }
        Ok(texts)
    }

    pub async fn wait_for_comment(&self, text: &str) -> E2eResult<()> {
        let what = format!("comment '{text}'");
        wait_until(&what, self.wait, &self.cancel, move || async move {
            let texts = self.comment_texts().await?;
            Ok(texts.iter().any(|t| t.contains(text)))
        })
        .await
    }

    /// The rendered comment containing `text`
    pub async fn comment_element(&self, text: &str) -> E2eResult<WebElement> {
        for elem in self.session.find_all(By::Css(dom::COMMENT)).await? {
            if elem.text().await?.contains(text) {
                return Ok(elem);
            }
        }
        Err(E2eError::AssertionFailed(format!(
            "no comment containing '{text}'"
        )))
    }

    /// Delete the comment containing `text` and wait for it to go away
    pub async fn delete_comment(&self, text: &str) -> E2eResult<()> {
        let comment = self.comment_element(text).await?;
        comment.find(By::Css(dom::DELETE_COMMENT)).await?.click().await?;

        let what = format!("comment '{text}' removed");
        wait_until(&what, self.wait, &self.cancel, move || async move {
            let texts = self.comment_texts().await?;
            Ok(!texts.iter().any(|t| t.contains(text)))
        })
        .await
    }
}
