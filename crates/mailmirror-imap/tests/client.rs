//! Client conversations against scripted servers.

#![allow(clippy::unwrap_used)]

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tokio_test::io::Builder;

use mailmirror_imap::sasl::xoauth2_response;
use mailmirror_imap::{
    Client, Config, Error, FetchAttribute, Flag, SearchCriteria, StoreAction, UidSet,
};

const GREETING: &[u8] = b"* OK [CAPABILITY IMAP4rev1 AUTH=XOAUTH2 SASL-IR] ready\r\n";

fn auth_line(tag: &str) -> Vec<u8> {
    format!(
        "{tag} AUTHENTICATE XOAUTH2 {}\r\n",
        xoauth2_response("me@example.com", "tok")
    )
    .into_bytes()
}

#[tokio::test]
async fn greeting_capabilities_are_recorded() {
    let mock = Builder::new().read(GREETING).build();
    let client = Client::from_stream(mock, &Config::new("localhost")).await.unwrap();
    assert!(client
        .capabilities()
        .iter()
        .any(|c| c.to_string() == "AUTH=XOAUTH2"));
    assert!(client.selected_mailbox().is_none());
}

#[tokio::test]
async fn bye_greeting_is_an_error() {
    let mock = Builder::new().read(b"* BYE too busy\r\n").build();
    let err = Client::from_stream(mock, &Config::new("localhost"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Bye(text) if text == "too busy"));
}

#[tokio::test]
async fn xoauth2_success_then_capability() {
    let mock = Builder::new()
        .read(GREETING)
        .write(&auth_line("A0000"))
        .read(b"A0000 OK [CAPABILITY IMAP4rev1 MOVE UIDPLUS] authenticated\r\n")
        .write(b"A0001 CAPABILITY\r\n")
        .read(b"* CAPABILITY IMAP4rev1 MOVE UIDPLUS LIST-EXTENDED\r\n")
        .read(b"A0001 OK done\r\n")
        .build();

    let mut client = Client::from_stream(mock, &Config::new("localhost")).await.unwrap();
    client.authenticate_xoauth2("me@example.com", "tok").await.unwrap();
    assert!(client.supports_move());

    client.capability().await.unwrap();
    assert!(client.supports_uidplus());
    assert!(client.supports_list_extended());
}

#[tokio::test]
async fn xoauth2_error_challenge() {
    let challenge = STANDARD
        .encode(r#"{"status":"401","schemes":"Bearer","scope":"https://mail.google.com/"}"#);
    let mock = Builder::new()
        .read(GREETING)
        .write(&auth_line("A0000"))
        .read(format!("+ {challenge}\r\n").as_bytes())
        .write(b"\r\n")
        .read(b"A0000 NO [AUTHENTICATIONFAILED] Invalid credentials (Failure)\r\n")
        .build();

    let mut client = Client::from_stream(mock, &Config::new("localhost")).await.unwrap();
    let err = client
        .authenticate_xoauth2("me@example.com", "tok")
        .await
        .unwrap_err();

    let Error::OAuth(oauth) = err else {
        panic!("expected OAuth error, got {err:?}");
    };
    assert_eq!(oauth.status, "401");
    assert_eq!(oauth.schemes, "Bearer");
    assert_eq!(oauth.scope.as_deref(), Some("https://mail.google.com/"));
}

#[tokio::test]
async fn xoauth2_plain_rejection() {
    let mock = Builder::new()
        .read(GREETING)
        .write(&auth_line("A0000"))
        .read(b"A0000 NO invalid token\r\n")
        .build();

    let mut client = Client::from_stream(mock, &Config::new("localhost")).await.unwrap();
    let err = client
        .authenticate_xoauth2("me@example.com", "tok")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Auth(text) if text == "invalid token"));
}

#[tokio::test]
async fn list_select_search_fetch() {
    let mock = Builder::new()
        .read(GREETING)
        .write(b"A0000 LIST \"\" \"*\"\r\n")
        .read(b"* LIST (\\HasNoChildren) \"/\" INBOX\r\n")
        .read(b"* LIST (\\Noselect \\HasChildren) \"/\" \"[Gmail]\"\r\n")
        .read(b"A0000 OK LIST completed\r\n")
        .write(b"A0001 SELECT INBOX\r\n")
        .read(b"* FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)\r\n")
        .read(b"* 3 EXISTS\r\n")
        .read(b"* OK [UIDVALIDITY 42] UIDs valid\r\n")
        .read(b"* OK [UIDNEXT 18] next\r\n")
        .read(b"A0001 OK [READ-WRITE] SELECT completed\r\n")
        .write(b"A0002 UID SEARCH ALL\r\n")
        .read(b"* SEARCH 12 13 17\r\n")
        .read(b"A0002 OK SEARCH completed\r\n")
        .write(b"A0003 UID FETCH 12,13 (ENVELOPE UID BODY.PEEK[HEADER] BODY.PEEK[TEXT])\r\n")
        .read(b"* 1 FETCH (UID 12 ENVELOPE (NIL \"one\" NIL NIL NIL NIL NIL NIL NIL NIL) BODY[HEADER] {4}\r\nA: 1 BODY[TEXT] {3}\r\nbd1)\r\n")
        .read(b"* 2 FETCH (FLAGS (\\Seen))\r\n")
        .read(b"* 2 FETCH (UID 13 ENVELOPE (NIL \"two\" NIL NIL NIL NIL NIL NIL NIL NIL) BODY[HEADER] {4}\r\nA: 2 BODY[TEXT] {3}\r\nbd2)\r\n")
        .read(b"A0003 OK FETCH completed\r\n")
        .build();

    let mut client = Client::from_stream(mock, &Config::new("localhost")).await.unwrap();

    let boxes = client.list("", "*").await.unwrap();
    assert_eq!(boxes.len(), 2);
    assert!(boxes[0].is_selectable());
    assert!(!boxes[1].is_selectable());

    let status = client.select("INBOX").await.unwrap();
    assert_eq!(status.exists, 3);
    assert_eq!(status.uid_validity.unwrap().get(), 42);
    assert_eq!(status.uid_next.unwrap().get(), 18);
    assert!(!status.read_only);
    assert_eq!(client.selected_mailbox(), Some("INBOX"));
    assert_eq!(client.selected_uid_validity().map(mailmirror_imap::UidValidity::get), Some(42));

    let uids = client.uid_search(&SearchCriteria::All).await.unwrap();
    assert_eq!(uids, vec![12, 13, 17]);

    let set = UidSet::from_uids([12, 13]).unwrap();
    let attributes = FetchAttribute::mirror();
    let mut fetch = client.uid_fetch(&set, &attributes).await.unwrap();

    let first = fetch.next().await.unwrap().unwrap();
    assert_eq!(first.uid.get(), 12);
    assert_eq!(first.envelope.subject.as_deref(), Some("one"));
    assert_eq!(first.raw(), b"A: 1bd1");

    let second = fetch.next().await.unwrap().unwrap();
    assert_eq!(second.uid.get(), 13);
    assert_eq!(second.text, b"bd2");

    assert!(fetch.next().await.unwrap().is_none());
}

#[tokio::test]
async fn abandoned_fetch_is_drained_before_next_command() {
    let mock = Builder::new()
        .read(GREETING)
        .write(b"A0000 SELECT INBOX\r\n")
        .read(b"A0000 OK SELECT completed\r\n")
        .write(b"A0001 UID FETCH 5 (UID BODY.PEEK[TEXT])\r\n")
        .read(b"* 1 FETCH (UID 5 BODY[TEXT] {1}\r\nx)\r\n")
        .read(b"* 2 FETCH (UID 6 BODY[TEXT] {1}\r\ny)\r\n")
        .read(b"A0001 OK done\r\n")
        .write(b"A0002 UID STORE 5 +FLAGS.SILENT (\\Seen)\r\n")
        .read(b"A0002 OK STORE completed\r\n")
        .build();

    let mut client = Client::from_stream(mock, &Config::new("localhost")).await.unwrap();
    client.select("INBOX").await.unwrap();

    let set = UidSet::from_uids([5]).unwrap();
    let attributes = [FetchAttribute::Uid, FetchAttribute::BodyPeek("TEXT".into())];
    {
        let mut fetch = client.uid_fetch(&set, &attributes).await.unwrap();
        assert_eq!(fetch.next().await.unwrap().unwrap().uid.get(), 5);
    }

    client
        .uid_store(&set, &StoreAction::Add(vec![Flag::Seen]))
        .await
        .unwrap();
}

#[tokio::test]
async fn commands_need_a_selected_mailbox() {
    let mock = Builder::new()
        .read(GREETING)
        .write(b"A0000 SELECT Missing\r\n")
        .read(b"A0000 NO [NONEXISTENT] no such mailbox\r\n")
        .build();

    let mut client = Client::from_stream(mock, &Config::new("localhost")).await.unwrap();
    assert!(matches!(
        client.uid_search(&SearchCriteria::All).await,
        Err(Error::InvalidState(_))
    ));
    assert!(matches!(client.select("Missing").await, Err(Error::No(_))));
    assert!(client.selected_mailbox().is_none());
    assert!(client.selected_uid_validity().is_none());
}

#[tokio::test]
async fn move_copy_and_expunge() {
    let mock = Builder::new()
        .read(b"* OK [CAPABILITY IMAP4rev1 MOVE UIDPLUS] ready\r\n")
        .write(b"A0000 SELECT INBOX\r\n")
        .read(b"A0000 OK SELECT completed\r\n")
        .write(b"A0001 UID MOVE 17 Archive\r\n")
        .read(b"* OK [COPYUID 9 17 1] moved\r\n")
        .read(b"* 3 EXPUNGE\r\n")
        .read(b"A0001 OK MOVE completed\r\n")
        .write(b"A0002 UID COPY 12 Archive\r\n")
        .read(b"A0002 OK COPY completed\r\n")
        .write(b"A0003 UID EXPUNGE 12\r\n")
        .read(b"A0003 OK EXPUNGE completed\r\n")
        .write(b"A0004 LOGOUT\r\n")
        .read(b"* BYE logging out\r\n")
        .read(b"A0004 OK LOGOUT completed\r\n")
        .build();

    let mut client = Client::from_stream(mock, &Config::new("localhost")).await.unwrap();
    client.select("INBOX").await.unwrap();
    client
        .uid_move(&UidSet::from_uids([17]).unwrap(), "Archive")
        .await
        .unwrap();
    let twelve = UidSet::from_uids([12]).unwrap();
    client.uid_copy(&twelve, "Archive").await.unwrap();
    client.uid_expunge(&twelve).await.unwrap();
    client.logout().await.unwrap();
}

#[tokio::test]
async fn oversized_message_is_skipped_and_fetch_continues() {
    let mock = Builder::new()
        .read(GREETING)
        .write(b"A0000 SELECT INBOX\r\n")
        .read(b"A0000 OK SELECT completed\r\n")
        .write(b"A0001 UID FETCH 12,13,17 (ENVELOPE UID BODY.PEEK[HEADER] BODY.PEEK[TEXT])\r\n")
        .read(b"* 1 FETCH (UID 12 ENVELOPE (NIL \"one\" NIL NIL NIL NIL NIL NIL NIL NIL) BODY[HEADER] {4}\r\nA: 1 BODY[TEXT] {3}\r\nbd1)\r\n")
        .read(b"* 2 FETCH (UID 13 ENVELOPE (NIL \"big\" NIL NIL NIL NIL NIL NIL NIL NIL) BODY[HEADER] {4}\r\nA: 2 BODY[TEXT] {40}\r\n")
        .read(b"0123456789012345678901234567890123456789)\r\n")
        .read(b"* 3 FETCH (UID 17 ENVELOPE (NIL \"three\" NIL NIL NIL NIL NIL NIL NIL NIL) BODY[HEADER] {4}\r\nA: 3 BODY[TEXT] {3}\r\nbd3)\r\n")
        .read(b"A0001 OK FETCH completed\r\n")
        .build();

    let config = Config::new("localhost").with_max_literal_size(16);
    let mut client = Client::from_stream(mock, &config).await.unwrap();
    client.select("INBOX").await.unwrap();

    let set = UidSet::from_uids([12, 13, 17]).unwrap();
    let mut fetch = client.uid_fetch(&set, &FetchAttribute::mirror()).await.unwrap();
    let mut uids = Vec::new();
    while let Some(message) = fetch.next().await.unwrap() {
        uids.push(message.uid.get());
    }
    assert_eq!(uids, vec![12, 17]);
    assert_eq!(fetch.oversized(), &[13]);
}
