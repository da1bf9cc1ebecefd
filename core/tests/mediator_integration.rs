//! End-to-end tests driving the real SMTP/IMAP mediator loops over
//! in-process duplex pipes standing in for the client socket and the
//! upstream TLS stream (the mediator is generic over `AsyncRead + AsyncWrite`,
//! so no actual TLS is needed to exercise it).

use oaproxy_core::account::InMemoryAccountProvider;
use oaproxy_core::framed::FramedStream;
use oaproxy_core::protocol::{imap, smtp};
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};

const BUF: usize = 8192;

async fn read_n(end: &mut DuplexStream, n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    end.read_exact(&mut buf).await.unwrap();
    buf
}

#[tokio::test]
async fn smtp_transparent_ehlo_passthrough() {
    let (client_far, mut client_near) = duplex(BUF);
    let (upstream_far, mut upstream_near) = duplex(BUF);
    let accounts = InMemoryAccountProvider::new();

    let handle = tokio::spawn(async move {
        let mut client = FramedStream::new(client_far, smtp::MAX_LINE);
        let mut upstream = FramedStream::new(upstream_far, smtp::MAX_LINE);
        smtp::run(&mut client, &mut upstream, &accounts, 1).await
    });

    let greeting: &[u8] = b"220 smtp.example.com ESMTP\r\n";
    upstream_near.write_all(greeting).await.unwrap();
    assert_eq!(read_n(&mut client_near, greeting.len()).await, greeting);

    let ehlo: &[u8] = b"EHLO client.example.com\r\n";
    client_near.write_all(ehlo).await.unwrap();
    assert_eq!(read_n(&mut upstream_near, ehlo.len()).await, ehlo);

    let reply = b"250-smtp.example.com at your service.\r\n250 SIZE 35882577\r\n";
    upstream_near.write_all(reply).await.unwrap();
    assert_eq!(read_n(&mut client_near, reply.len()).await, reply);

    let quit: &[u8] = b"QUIT\r\n";
    client_near.write_all(quit).await.unwrap();
    assert_eq!(read_n(&mut upstream_near, quit.len()).await, quit);

    drop(client_near);
    drop(upstream_near);
    let _ = handle.await;
}

#[tokio::test]
async fn smtp_auth_plain_substitutes_xoauth2() {
    let (client_far, mut client_near) = duplex(BUF);
    let (upstream_far, mut upstream_near) = duplex(BUF);
    let accounts = InMemoryAccountProvider::new().with_account("user1@example.com", "tokuser1abc");

    let handle = tokio::spawn(async move {
        let mut client = FramedStream::new(client_far, smtp::MAX_LINE);
        let mut upstream = FramedStream::new(upstream_far, smtp::MAX_LINE);
        smtp::run(&mut client, &mut upstream, &accounts, 1).await
    });

    client_near
        .write_all(b"AUTH PLAIN AHVzZXIxQGV4YW1wbGUuY29tAHBhc3MxMjM=\r\n")
        .await
        .unwrap();

    let expected =
        b"AUTH XOAUTH2 dXNlcj11c2VyMUBleGFtcGxlLmNvbQFhdXRoPUJlYXJlciB0b2t1c2VyMWFiYwEB\r\n";
    assert_eq!(read_n(&mut upstream_near, expected.len()).await, expected);

    drop(client_near);
    drop(upstream_near);
    let _ = handle.await;
}

#[tokio::test]
async fn smtp_auth_plain_unknown_user_is_denied_locally() {
    let (client_far, mut client_near) = duplex(BUF);
    let (upstream_far, mut upstream_near) = duplex(BUF);
    let accounts = InMemoryAccountProvider::new();

    let handle = tokio::spawn(async move {
        let mut client = FramedStream::new(client_far, smtp::MAX_LINE);
        let mut upstream = FramedStream::new(upstream_far, smtp::MAX_LINE);
        smtp::run(&mut client, &mut upstream, &accounts, 1).await
    });

    client_near
        .write_all(b"AUTH PLAIN dGVzdAB1c2VyMkBtYWlsLmNvbQA=\r\n")
        .await
        .unwrap();
    let denial: &[u8] = b"535 Invalid username or password\r\n";
    assert_eq!(read_n(&mut client_near, denial.len()).await, denial);

    // Nothing was forwarded upstream for the denied AUTH attempt: the next
    // command the upstream observes is the one sent right after it.
    let quit: &[u8] = b"QUIT\r\n";
    client_near.write_all(quit).await.unwrap();
    assert_eq!(read_n(&mut upstream_near, quit.len()).await, quit);

    drop(client_near);
    drop(upstream_near);
    let _ = handle.await;
}

#[tokio::test]
async fn smtp_auth_capability_rewrite() {
    let (client_far, mut client_near) = duplex(BUF);
    let (upstream_far, mut upstream_near) = duplex(BUF);
    let accounts = InMemoryAccountProvider::new();

    let handle = tokio::spawn(async move {
        let mut client = FramedStream::new(client_far, smtp::MAX_LINE);
        let mut upstream = FramedStream::new(upstream_far, smtp::MAX_LINE);
        smtp::run(&mut client, &mut upstream, &accounts, 1).await
    });

    upstream_near
        .write_all(b"250-AUTH LOGIN DIGEST XOAUTH2\r\n250 SIZE 35882577\r\n")
        .await
        .unwrap();

    let expected = b"250-AUTH PLAIN\r\n250 SIZE 35882577\r\n";
    assert_eq!(read_n(&mut client_near, expected.len()).await, expected);

    drop(client_near);
    drop(upstream_near);
    let _ = handle.await;
}

#[tokio::test]
async fn smtp_data_stays_opaque_and_auth_resumes_after() {
    let (client_far, mut client_near) = duplex(BUF);
    let (upstream_far, mut upstream_near) = duplex(BUF);
    let accounts = InMemoryAccountProvider::new().with_account("user1@example.com", "tokuser1abc");

    let handle = tokio::spawn(async move {
        let mut client = FramedStream::new(client_far, smtp::MAX_LINE);
        let mut upstream = FramedStream::new(upstream_far, smtp::MAX_LINE);
        smtp::run(&mut client, &mut upstream, &accounts, 1).await
    });

    let data_cmd: &[u8] = b"DATA\r\n";
    client_near.write_all(data_cmd).await.unwrap();
    assert_eq!(read_n(&mut upstream_near, data_cmd.len()).await, data_cmd);

    let go_ahead: &[u8] = b"354 Go ahead.\r\n";
    upstream_near.write_all(go_ahead).await.unwrap();
    assert_eq!(read_n(&mut client_near, go_ahead.len()).await, go_ahead);

    let body = b"Subject: hi\r\n\r\nAUTH PLAIN AHVzZXIxQGV4YW1wbGUuY29tAA==\r\n\r\n.\r\n";
    client_near.write_all(body).await.unwrap();
    assert_eq!(read_n(&mut upstream_near, body.len()).await, body);

    // A real AUTH PLAIN sent after DATA ended is substituted as normal.
    client_near
        .write_all(b"AUTH PLAIN AHVzZXIxQGV4YW1wbGUuY29tAHBhc3MxMjM=\r\n")
        .await
        .unwrap();
    let expected =
        b"AUTH XOAUTH2 dXNlcj11c2VyMUBleGFtcGxlLmNvbQFhdXRoPUJlYXJlciB0b2t1c2VyMWFiYwEB\r\n";
    assert_eq!(read_n(&mut upstream_near, expected.len()).await, expected);

    drop(client_near);
    drop(upstream_near);
    let _ = handle.await;
}

#[tokio::test]
async fn imap_login_substitutes_authenticate_xoauth2() {
    let (client_far, mut client_near) = duplex(BUF);
    let (upstream_far, mut upstream_near) = duplex(BUF);
    let accounts = InMemoryAccountProvider::new().with_account("user1@example.com", "tokuser1abc");

    let handle = tokio::spawn(async move {
        let mut client = FramedStream::new(client_far, imap::MAX_LINE);
        let mut upstream = FramedStream::new(upstream_far, imap::MAX_LINE);
        imap::run(&mut client, &mut upstream, &accounts, 1).await
    });

    client_near
        .write_all(b"tg1 LOGIN \"user1@example.com\" dummypass\r\ntg2 SELECT \"INBOX\"\r\n")
        .await
        .unwrap();

    let expected = b"tg1 AUTHENTICATE XOAUTH2 dXNlcj11c2VyMUBleGFtcGxlLmNvbQFhdXRoPUJlYXJlciB0b2t1c2VyMWFiYwEB\r\ntg2 SELECT \"INBOX\"\r\n";
    assert_eq!(read_n(&mut upstream_near, expected.len()).await, expected);

    drop(client_near);
    drop(upstream_near);
    let _ = handle.await;
}

#[tokio::test]
async fn imap_login_unknown_user_is_denied_locally() {
    let (client_far, mut client_near) = duplex(BUF);
    let (upstream_far, mut upstream_near) = duplex(BUF);
    let accounts = InMemoryAccountProvider::new();

    let handle = tokio::spawn(async move {
        let mut client = FramedStream::new(client_far, imap::MAX_LINE);
        let mut upstream = FramedStream::new(upstream_far, imap::MAX_LINE);
        imap::run(&mut client, &mut upstream, &accounts, 1).await
    });

    client_near
        .write_all(b"a1 LOGIN \"nobody@example.com\" x\r\n")
        .await
        .unwrap();
    let denial: &[u8] = b"a1 NO Invalid username\r\n";
    assert_eq!(read_n(&mut client_near, denial.len()).await, denial);

    drop(client_near);
    drop(upstream_near);
    let _ = handle.await;
}

#[tokio::test]
async fn imap_capability_rewrite() {
    let (client_far, mut client_near) = duplex(BUF);
    let (upstream_far, mut upstream_near) = duplex(BUF);
    let accounts = InMemoryAccountProvider::new();

    let handle = tokio::spawn(async move {
        let mut client = FramedStream::new(client_far, imap::MAX_LINE);
        let mut upstream = FramedStream::new(upstream_far, imap::MAX_LINE);
        imap::run(&mut client, &mut upstream, &accounts, 1).await
    });

    upstream_near
        .write_all(b"* CAPABILITY IMAP4rev1 auth=plain UNSELECT AUTH=XOAUTH2 IDLE logindisabled NAMESPACE\r\n")
        .await
        .unwrap();

    let expected = b"* CAPABILITY IMAP4rev1 UNSELECT IDLE NAMESPACE\r\n";
    assert_eq!(read_n(&mut client_near, expected.len()).await, expected);

    drop(client_near);
    drop(upstream_near);
    let _ = handle.await;
}
