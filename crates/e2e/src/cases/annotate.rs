//! Makes sure the annotation related capabilities work as expected.
//!
//! Every case here writes comments as the test user, so the runner purges
//! that user's comments before and after each one.

use futures::future::{FutureExt, LocalBoxFuture};
use thirtyfour::prelude::*;

use super::{CaseFn, Group, TestCase};
use crate::error::{ensure, E2eError, E2eResult};
use crate::media::{find_urls, link_label, Preview};
use crate::page::{dom, Bookreader};

const CHAPTER: &str = "prologue";

pub(super) fn cases() -> Vec<TestCase> {
    let case = |name, description, run: CaseFn| {
        TestCase::new(Group::Annotate, name, description, run).mutating()
    };

    vec![
        case("add_annotation", "A simple comment is added", add_annotation),
        case(
            "check_for_empty_comment",
            "An empty comment shows the form error and stores nothing",
            check_for_empty_comment,
        ),
        case(
            "cancel_resets_error_element",
            "Cancel hides the empty comment error",
            cancel_resets_error_element,
        ),
        case(
            "submit_resets_error_element",
            "A valid submission hides the empty comment error",
            submit_resets_error_element,
        ),
        case("delete_comment", "Comments are deleted", delete_comment),
        case(
            "multiple_comments_from_user",
            "Several comments from one user on one block are all shown",
            multiple_comments_from_user,
        ),
        case(
            "delete_one_of_multiple_comments",
            "Deleting one of several comments leaves the others",
            delete_one_of_multiple_comments,
        ),
        case(
            "display_urls_as_links",
            "Referenced URLs become truncated anchors",
            display_urls_as_links,
        ),
        case("display_youtube", "YouTube links get a video preview", display_youtube),
        case("display_vimeo", "Vimeo links get a video preview", display_vimeo),
        case("display_twitpic", "Twitpic links get an image preview", display_twitpic),
        case("display_yfrog", "yFrog links get an image preview", display_yfrog),
        case("display_soundcloud", "SoundCloud links get an audio preview", display_soundcloud),
        case("display_png", "PNG links get an image preview", display_png),
        case("display_gif", "GIF links get an image preview", display_gif),
        case("display_jpg", "JPG links get an image preview", display_jpg),
        case("display_ogg", "OGG links get an audio preview", display_ogg),
        case("display_mp3", "MP3 links get an audio preview", display_mp3),
    ]
}

fn add_annotation(page: &Bookreader) -> LocalBoxFuture<'_, E2eResult<()>> {
    async move {
        page.annotate_first_block(CHAPTER).await?;
        page.add_comment("This is a simple test comment.").await?;

        page.expect_visible(By::Id(dom::COMMENT_VALUES), "comment values").await?;
        page.expect_hidden(By::Id(dom::NOTHING_TAGGED_LOGGED_IN), "empty notice")
            .await?;
        page.expect_hidden(By::Id(dom::NEW_COMMENT_FORM), "comment form").await?;
        page.expect_visible(By::Id(dom::ANNOTATE_BUTTON), "annotate button").await
    }
    .boxed_local()
}

/// Number of comments by the logged-in user on the open block
async fn own_comment_count(page: &Bookreader) -> E2eResult<usize> {
    Ok(page
        .session()
        .find_all(By::Css(format!("{} {}", dom::COMMENT, dom::DELETE_COMMENT)))
        .await?
        .len())
}

/// Submit `blank` as a comment and wait for the form error
async fn submit_empty(page: &Bookreader, blank: &str) -> E2eResult<()> {
    page.start_comment().await?;
    page.submit_comment(blank).await?;
    page.wait_visible(By::Id(dom::NEW_COMMENT_ERROR), "empty comment error")
        .await
}

fn check_for_empty_comment(page: &Bookreader) -> LocalBoxFuture<'_, E2eResult<()>> {
    async move {
        page.annotate_first_block(CHAPTER).await?;
        let before = own_comment_count(page).await?;

        submit_empty(page, "").await?;
        page.expect_visible(By::Id(dom::NEW_COMMENT_FORM), "comment form").await?;

        // Whitespace only counts as empty too.
        page.cancel_comment().await?;
        submit_empty(page, "   ").await?;
        page.expect_visible(By::Id(dom::NEW_COMMENT_FORM), "comment form").await?;

        // Reload the block's comments from the store to be sure nothing
        // was written.
        page.close_annotations().await?;
        page.open_annotations().await?;
        let after = own_comment_count(page).await?;
        ensure(before == after, || {
            format!("empty submission changed own comments from {before} to {after}")
        })
    }
    .boxed_local()
}

fn cancel_resets_error_element(page: &Bookreader) -> LocalBoxFuture<'_, E2eResult<()>> {
    async move {
        page.annotate_first_block(CHAPTER).await?;
        submit_empty(page, "").await?;

        page.cancel_comment().await?;
        page.expect_hidden(By::Id(dom::NEW_COMMENT_ERROR), "empty comment error")
            .await?;

        page.start_comment().await?;
        page.expect_hidden(By::Id(dom::NEW_COMMENT_ERROR), "empty comment error")
            .await
    }
    .boxed_local()
}

fn submit_resets_error_element(page: &Bookreader) -> LocalBoxFuture<'_, E2eResult<()>> {
    async move {
        let text = "Second time lucky.";
        page.annotate_first_block(CHAPTER).await?;
        submit_empty(page, "").await?;

        page.submit_comment(text).await?;
        page.wait_for_comment(text).await?;
        page.expect_hidden(By::Id(dom::NEW_COMMENT_ERROR), "empty comment error")
            .await
    }
    .boxed_local()
}

fn delete_comment(page: &Bookreader) -> LocalBoxFuture<'_, E2eResult<()>> {
    async move {
        let text = "A comment that will be deleted.";
        page.annotate_first_block(CHAPTER).await?;
        page.add_comment(text).await?;

        page.delete_comment(text).await?;
        let texts = page.comment_texts().await?;
        ensure(!texts.iter().any(|t| t.contains(text)), || {
            format!("'{text}' still shown after delete")
        })
    }
    .boxed_local()
}

fn multiple_comments_from_user(page: &Bookreader) -> LocalBoxFuture<'_, E2eResult<()>> {
    async move {
        let first = "The first of two comments.";
        let second = "The second of two comments.";
        page.annotate_first_block(CHAPTER).await?;
        page.add_comment(first).await?;
        page.add_comment(second).await?;

        let texts = page.comment_texts().await?;
        let position = |needle: &str| texts.iter().position(|t| t.contains(needle));
        match (position(first), position(second)) {
            (Some(a), Some(b)) => ensure(b < a, || "newest comment is not listed first".into())?,
            found => {
                return Err(E2eError::AssertionFailed(format!(
                    "expected both comments, found positions {found:?}"
                )))
            }
        }

        // Both survive a reload from the store.
        page.close_annotations().await?;
        page.open_annotations().await?;
        page.wait_for_comment(first).await?;
        page.wait_for_comment(second).await?;
        let own = own_comment_count(page).await?;
        ensure(own == 2, || format!("expected 2 own comments, found {own}"))
    }
    .boxed_local()
}

fn delete_one_of_multiple_comments(page: &Bookreader) -> LocalBoxFuture<'_, E2eResult<()>> {
    async move {
        let keep = "This comment stays.";
        let remove = "This comment goes.";
        page.annotate_first_block(CHAPTER).await?;
        page.add_comment(keep).await?;
        page.add_comment(remove).await?;

        page.delete_comment(remove).await?;
        let texts = page.comment_texts().await?;
        ensure(texts.iter().any(|t| t.contains(keep)), || {
            format!("'{keep}' disappeared with the deleted comment")
        })?;

        page.close_annotations().await?;
        page.open_annotations().await?;
        page.wait_for_comment(keep).await?;
        let texts = page.comment_texts().await?;
        ensure(!texts.iter().any(|t| t.contains(remove)), || {
            format!("'{remove}' came back after reload")
        })
    }
    .boxed_local()
}

fn display_urls_as_links(page: &Bookreader) -> LocalBoxFuture<'_, E2eResult<()>> {
    async move {
        let marker = "Further reading:";
        let body = format!(
            "{marker} http://fluidinfo.com/ and \
             http://barefootintocyberspace.com/book/chapters/prologue/notes"
        );
        page.annotate_first_block(CHAPTER).await?;
        page.start_comment().await?;
        page.submit_comment(&body).await?;
        // Rendered text shows link labels rather than the raw URLs.
        page.wait_for_comment(marker).await?;

        let comment = page.comment_element(marker).await?;
        let anchors = comment.find_all(By::Css("a[target='_new']")).await?;
        let urls = find_urls(&body);
        ensure(anchors.len() == urls.len(), || {
            format!("expected {} anchors, found {}", urls.len(), anchors.len())
        })?;

        for (anchor, url) in anchors.iter().zip(urls) {
            let href = anchor.attr("href").await?;
            ensure(href.as_deref() == Some(url), || {
                format!("anchor for {url} points at {href:?}")
            })?;

            let label = anchor.text().await?;
            let expected = link_label(url);
            ensure(label == expected, || {
                format!("anchor for {url} reads '{label}', expected '{expected}'")
            })?;
        }
        Ok(())
    }
    .boxed_local()
}

/// Post a comment linking `url` and exercise its media preview
async fn media_preview(page: &Bookreader, url: &str) -> E2eResult<()> {
    let preview = Preview::for_url(url)
        .ok_or_else(|| E2eError::AssertionFailed(format!("{url} has no media preview")))?;
    let marker = "Media check";

    page.annotate_first_block(CHAPTER).await?;
    page.start_comment().await?;
    page.submit_comment(&format!("{marker} {url}")).await?;
    page.wait_for_comment(marker).await?;

    let comment = page.comment_element(marker).await?;
    let embedded = By::Css(preview.element);
    let label = format!("{} preview <{}>", preview.kind.as_str(), preview.element);

    comment.find(By::LinkText("View media")).await?.click().await?;
    page.wait_for(&format!("{label} shown"), || {
        let comment = comment.clone();
        let embedded = embedded.clone();
        async move { displayed_count(&comment, embedded).await.map(|n| n == 1) }
    })
    .await?;

    let total = comment.find_all(embedded.clone()).await?.len();
    ensure(total == 1, || {
        format!("expected exactly one {label} for {url}, found {total}")
    })?;

    comment.find(By::LinkText("Hide media")).await?.click().await?;
    page.wait_for(&format!("{label} hidden"), || {
        let comment = comment.clone();
        let embedded = embedded.clone();
        async move { displayed_count(&comment, embedded).await.map(|n| n == 0) }
    })
    .await?;

    comment.find(By::LinkText("View media")).await?.click().await?;
    page.wait_for(&format!("{label} shown again"), || {
        let comment = comment.clone();
        let embedded = embedded.clone();
        async move { displayed_count(&comment, embedded).await.map(|n| n == 1) }
    })
    .await
}

async fn displayed_count(scope: &WebElement, by: By) -> E2eResult<usize> {
    let mut shown = 0;
    for elem in scope.find_all(by).await? {
        if elem.is_displayed().await? {
            shown += 1;
        }
    }
    Ok(shown)
}

macro_rules! media_case {
    ($name:ident, $url:expr) => {
        fn $name(page: &Bookreader) -> LocalBoxFuture<'_, E2eResult<()>> {
            media_preview(page, $url).boxed_local()
        }
    };
}

media_case!(display_youtube, "http://www.youtube.com/watch?v=dQw4w9WgXcQ");
media_case!(display_vimeo, "http://vimeo.com/2696386");
media_case!(display_twitpic, "http://twitpic.com/4t3m1k");
media_case!(display_yfrog, "http://yfrog.com/h4xlzcj");
media_case!(display_soundcloud, "http://soundcloud.com/forss/flickermood");
media_case!(display_png, "http://barefootintocyberspace.com/images/cover.png");
media_case!(display_gif, "http://barefootintocyberspace.com/images/cover.gif");
media_case!(display_jpg, "http://barefootintocyberspace.com/images/cover.jpg");
media_case!(display_ogg, "http://barefootintocyberspace.com/audio/reading.ogg");
media_case!(display_mp3, "http://barefootintocyberspace.com/audio/reading.mp3");
