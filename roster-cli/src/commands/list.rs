//! Show an account's cached items.

use anyhow::Result;
use roster_client::JsonFileStore;
use roster_core::{BookmarkItem, Colour, ContactItem, RosterItem, ServiceKind};
use roster_types::Address;
use std::fmt::Write;

use super::{cached_bookmarks, cached_contacts};

/// Run the list command.
pub async fn run(store: &JsonFileStore, account: &Address, kind: Option<ServiceKind>) -> Result<()> {
    let contacts = match kind {
        None | Some(ServiceKind::Contacts) => Some(cached_contacts(store, account).await?),
        Some(ServiceKind::Bookmarks) => None,
    };
    let bookmarks = match kind {
        None | Some(ServiceKind::Bookmarks) => Some(cached_bookmarks(store, account).await?),
        Some(ServiceKind::Contacts) => None,
    };

    print!("{}", render(account, contacts.as_deref(), bookmarks.as_deref()));
    Ok(())
}

fn render(
    account: &Address,
    contacts: Option<&[ContactItem]>,
    bookmarks: Option<&[BookmarkItem]>,
) -> String {
    let account = account.bare();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} (colour {})",
        account,
        Colour::from_text(&account.to_string())
    );

    if let Some(contacts) = contacts {
        let _ = writeln!(out);
        let _ = writeln!(out, "Contacts ({}):", contacts.len());
        for item in contacts {
            let _ = write!(out, "  {}", describe(item));
            if !item.tags().is_empty() {
                let tags: Vec<&str> = item.tags().iter().map(String::as_str).collect();
                let _ = write!(out, " [{}]", tags.join(", "));
            }
            let _ = writeln!(out, " ({})", item.subscription());
        }
    }

    if let Some(bookmarks) = bookmarks {
        let _ = writeln!(out);
        let _ = writeln!(out, "Bookmarks ({}):", bookmarks.len());
        for item in bookmarks {
            let _ = write!(out, "  {}", describe(item));
            if let Some(nick) = item.nick() {
                let _ = write!(out, " nick={}", nick);
            }
            if item.autojoin() {
                let _ = write!(out, " autojoin");
            }
            let _ = writeln!(out);
        }
    }

    out
}

/// "Label <address>", or just the address when unlabelled.
fn describe(item: &dyn RosterItem) -> String {
    match item.raw_label() {
        Some(label) if !label.is_empty() => format!("{} <{}>", label, item.address()),
        _ => item.address().to_string(),
    }
}
