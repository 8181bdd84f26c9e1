//! Ensures the application starts in a good state.

use futures::future::{FutureExt, LocalBoxFuture};
use thirtyfour::By;

use super::{CaseFn, Group, TestCase};
use crate::error::E2eResult;
use crate::page::{dom, Bookreader};

pub(super) fn cases() -> Vec<TestCase> {
    let case = |name, description, run: CaseFn| {
        TestCase::new(Group::Initialisation, name, description, run)
    };

    vec![
        case("about_start_state", "The about pane is displayed", about_start_state),
        case("colophon_start_state", "The colophon is not displayed", colophon_start_state),
        case("help_start_state", "The help pane is not displayed", help_start_state),
        case("oops_start_state", "The error pane is not displayed", oops_start_state),
        case("working_start_state", "The working notice is not displayed", working_start_state),
    ]
}

fn about_start_state(page: &Bookreader) -> LocalBoxFuture<'_, E2eResult<()>> {
    async move { page.expect_visible(By::Id(dom::ABOUT), "about pane").await }.boxed_local()
}

fn colophon_start_state(page: &Bookreader) -> LocalBoxFuture<'_, E2eResult<()>> {
    async move { page.expect_hidden(By::Id(dom::COLOPHON), "colophon").await }.boxed_local()
}

fn help_start_state(page: &Bookreader) -> LocalBoxFuture<'_, E2eResult<()>> {
    async move { page.expect_hidden(By::Id(dom::HELP), "help pane").await }.boxed_local()
}

fn oops_start_state(page: &Bookreader) -> LocalBoxFuture<'_, E2eResult<()>> {
    async move { page.expect_hidden(By::Id(dom::OOPS), "error pane").await }.boxed_local()
}

fn working_start_state(page: &Bookreader) -> LocalBoxFuture<'_, E2eResult<()>> {
    async move { page.expect_hidden(By::Id(dom::WORKING), "working notice").await }.boxed_local()
}
