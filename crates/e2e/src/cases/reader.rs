//! Checks the reading side of the application.

use futures::future::{FutureExt, LocalBoxFuture};
use thirtyfour::By;

use super::{CaseFn, Group, TestCase};
use crate::error::{ensure, E2eResult};
use crate::page::{dom, Bookreader};

/// First and second entries of the chapter list
const FIRST_CHAPTER: &str = "prologue";
const SECOND_CHAPTER: &str = "command";

pub(super) fn cases() -> Vec<TestCase> {
    let case = |name, description, run: CaseFn| TestCase::new(Group::Reader, name, description, run);

    vec![
        case("reader_menu_items", "The chapter menu loads the chapters", reader_menu_items),
        case("tag_link", "The tag link opens the annotation lightbox", tag_link),
        case(
            "annotate_this_for_logged_in_user",
            "Only logged-in users get the \"Annotate this!\" button",
            annotate_this_for_logged_in_user,
        ),
        case("previous_button", "The previous button moves back a chapter", previous_button),
        case("next_button", "The next button moves on a chapter", next_button),
        case(
            "participant_count",
            "The participant counter is displayed once a block has comments",
            participant_count,
        )
        .mutating(),
    ]
}

fn reader_menu_items(page: &Bookreader) -> LocalBoxFuture<'_, E2eResult<()>> {
    async move {
        page.open_chapter(FIRST_CHAPTER).await?;

        page.expect_hidden(By::Id(dom::ABOUT), "about pane").await?;
        page.expect_visible(By::Id(dom::BOTTOM_NAV), "chapter navigation").await?;

        let blocks = page.session().find_all(By::Css(dom::TEXT_BLOCK)).await?;
        ensure(!blocks.is_empty(), || format!("chapter '{FIRST_CHAPTER}' has no text"))?;

        let tags = page.session().find_all(By::Css(dom::TAG_LINK)).await?;
        ensure(tags.len() == blocks.len(), || {
            format!("{} blocks but {} tag links", blocks.len(), tags.len())
        })
    }
    .boxed_local()
}

fn tag_link(page: &Bookreader) -> LocalBoxFuture<'_, E2eResult<()>> {
    async move {
        page.open_chapter(FIRST_CHAPTER).await?;
        page.expect_hidden(By::Id(dom::ANNOTATIONS), "annotation lightbox").await?;

        page.open_annotations().await?;
        page.expect_hidden(By::Id(dom::NEW_COMMENT_CONTAINER), "new comment controls")
            .await?;

        page.close_annotations().await
    }
    .boxed_local()
}

fn annotate_this_for_logged_in_user(page: &Bookreader) -> LocalBoxFuture<'_, E2eResult<()>> {
    async move {
        page.open_chapter(FIRST_CHAPTER).await?;
        page.open_annotations().await?;
        page.expect_hidden(By::Id(dom::ANNOTATE_BUTTON), "annotate button")
            .await?;
        page.close_annotations().await?;

        page.annotate_first_block(FIRST_CHAPTER).await?;
        page.expect_visible(By::Id(dom::NEW_COMMENT_CONTAINER), "new comment controls")
            .await?;
        page.expect_visible(By::Id(dom::ANNOTATE_BUTTON), "annotate button").await?;
        page.expect_hidden(By::Id(dom::NEW_COMMENT_FORM), "comment form").await
    }
    .boxed_local()
}

fn previous_button(page: &Bookreader) -> LocalBoxFuture<'_, E2eResult<()>> {
    async move {
        page.open_chapter(SECOND_CHAPTER).await?;
        page.expect_visible(By::Id(dom::PREVIOUS), "previous button").await?;
        let target = page.nav_target(dom::PREVIOUS).await?;
        let expected = format!("#{FIRST_CHAPTER}");
        ensure(target.as_deref() == Some(expected.as_str()), || {
            format!("previous button points at {target:?}")
        })?;

        page.session().click(By::Id(dom::PREVIOUS)).await?;

        // The first chapter has nothing before it.
        page.wait_nav_target(dom::NEXT, &format!("#{SECOND_CHAPTER}")).await?;
        page.wait_chapter(FIRST_CHAPTER).await?;
        page.wait_hidden(By::Id(dom::PREVIOUS), "previous button").await
    }
    .boxed_local()
}

fn next_button(page: &Bookreader) -> LocalBoxFuture<'_, E2eResult<()>> {
    async move {
        page.open_chapter(FIRST_CHAPTER).await?;
        page.expect_hidden(By::Id(dom::PREVIOUS), "previous button").await?;
        page.expect_visible(By::Id(dom::NEXT), "next button").await?;

        page.session().click(By::Id(dom::NEXT)).await?;

        page.wait_nav_target(dom::PREVIOUS, &format!("#{FIRST_CHAPTER}")).await?;
        page.wait_chapter(SECOND_CHAPTER).await?;
        page.expect_visible(By::Id(dom::PREVIOUS), "previous button").await
    }
    .boxed_local()
}

fn participant_count(page: &Bookreader) -> LocalBoxFuture<'_, E2eResult<()>> {
    async move {
        page.login().await?;
        page.open_chapter(FIRST_CHAPTER).await?;
        // Other readers may already have commented on this block.
        let before = participants(page).await?;

        page.open_annotations().await?;
        page.add_comment("Counting participants.").await?;
        page.close_annotations().await?;

        // The counter is refreshed asynchronously after the save.
        page.wait_for("participant counter to go up", move || async move {
            Ok(participants(page).await? > before)
        })
        .await
    }
    .boxed_local()
}

/// Counter next to the first block; blank means nobody yet
async fn participants(page: &Bookreader) -> E2eResult<u32> {
    Ok(page.first_block_counter().await?.parse().unwrap_or(0))
}
