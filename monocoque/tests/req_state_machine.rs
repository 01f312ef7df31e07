//! REQ socket state machine integration tests.
//!
//! Exercises strict alternation, relaxed mode, and correlation mode against
//! a real REP peer over a loopback TCP connection.

use monocoque_zmtp::req::ReqSocket;
use monocoque_zmtp::rep::RepSocket;
use monocoque_core::options::SocketOptions;
use bytes::Bytes;
use std::io;

#[compio::test]
async fn test_req_strict_send_send_fails() -> io::Result<()> {
    let listener = compio::net::TcpListener::bind("127.0.0.1:0").await?;
    let server_addr = listener.local_addr()?;

    let server_task = compio::runtime::spawn(async move {
        let (stream, _) = listener.accept().await?;
        let rep_socket = RepSocket::new(stream).await?;

        let _req = rep_socket.recv().await?;
        rep_socket.send(vec![Bytes::from("reply1")]).await?;

        Ok::<(), io::Error>(())
    });

    compio::time::sleep(std::time::Duration::from_millis(50)).await;

    let stream = compio::net::TcpStream::connect(server_addr).await?;
    let mut options = SocketOptions::default();
    options.req_relaxed = false; // Explicit strict mode
    let req_socket = ReqSocket::with_options(stream, options).await?;

    // First send should work
    req_socket.send(vec![Bytes::from("request1")]).await?;

    // Second send without recv should fail in strict mode
    let result = req_socket.send(vec![Bytes::from("request2")]).await;
    assert!(
        result.is_err(),
        "Expected error when sending twice without recv in strict mode"
    );

    let err = result.unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    assert!(err.to_string().contains("not valid in current socket state"));

    let _reply = req_socket.recv().await?;
    server_task.await?;

    Ok(())
}

#[compio::test]
async fn test_req_strict_recv_recv_fails() -> io::Result<()> {
    let listener = compio::net::TcpListener::bind("127.0.0.1:0").await?;
    let server_addr = listener.local_addr()?;

    let server_task = compio::runtime::spawn(async move {
        let (stream, _) = listener.accept().await?;
        let rep_socket = RepSocket::new(stream).await?;

        let _req = rep_socket.recv().await?;
        rep_socket.send(vec![Bytes::from("reply1")]).await?;

        Ok::<(), io::Error>(())
    });

    compio::time::sleep(std::time::Duration::from_millis(50)).await;

    let stream = compio::net::TcpStream::connect(server_addr).await?;
    let req_socket = ReqSocket::new(stream).await?; // Default is strict

    req_socket.send(vec![Bytes::from("request1")]).await?;
    let _reply = req_socket.recv().await?;

    // Socket is back in Idle state; recv without send should fail
    let result = req_socket.recv().await;
    assert!(
        result.is_err(),
        "Expected error when receiving twice without send in strict mode"
    );

    let err = result.unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    assert!(err.to_string().contains("not valid in current socket state"));

    server_task.await?;
    Ok(())
}

#[compio::test]
async fn test_req_relaxed_send_send_succeeds() -> io::Result<()> {
    let listener = compio::net::TcpListener::bind("127.0.0.1:0").await?;
    let server_addr = listener.local_addr()?;

    let server_task = compio::runtime::spawn(async move {
        let (stream, _) = listener.accept().await?;
        let rep_socket = RepSocket::new(stream).await?;

        let _req1 = rep_socket.recv().await?;
        rep_socket.send(vec![Bytes::from("reply1")]).await?;

        let _req2 = rep_socket.recv().await?;
        rep_socket.send(vec![Bytes::from("reply2")]).await?;

        Ok::<(), io::Error>(())
    });

    compio::time::sleep(std::time::Duration::from_millis(50)).await;

    let stream = compio::net::TcpStream::connect(server_addr).await?;
    let mut options = SocketOptions::default();
    options.req_relaxed = true;
    let req_socket = ReqSocket::with_options(stream, options).await?;

    // Send multiple requests without waiting for replies
    req_socket.send(vec![Bytes::from("request1")]).await?;
    req_socket.send(vec![Bytes::from("request2")]).await?;

    let reply1 = req_socket.recv().await?;
    assert!(reply1.is_some());

    let reply2 = req_socket.recv().await?;
    assert!(reply2.is_some());

    server_task.await?;
    Ok(())
}

#[compio::test]
async fn test_req_strict_normal_flow() -> io::Result<()> {
    let listener = compio::net::TcpListener::bind("127.0.0.1:0").await?;
    let server_addr = listener.local_addr()?;

    let server_task = compio::runtime::spawn(async move {
        let (stream, _) = listener.accept().await?;
        let rep_socket = RepSocket::new(stream).await?;

        for i in 0..3 {
            let req = rep_socket.recv().await?.expect("Should receive request");
            assert_eq!(req[0], Bytes::from(format!("request{}", i)));

            rep_socket.send(vec![Bytes::from(format!("reply{}", i))]).await?;
        }

        Ok::<(), io::Error>(())
    });

    compio::time::sleep(std::time::Duration::from_millis(50)).await;

    let stream = compio::net::TcpStream::connect(server_addr).await?;
    let req_socket = ReqSocket::new(stream).await?;

    for i in 0..3 {
        req_socket.send(vec![Bytes::from(format!("request{}", i))]).await?;
        let reply = req_socket.recv().await?.expect("Should receive reply");
        assert_eq!(reply[0], Bytes::from(format!("reply{}", i)));
    }

    server_task.await?;
    Ok(())
}

#[compio::test]
async fn test_req_correlation_mode() -> io::Result<()> {
    let listener = compio::net::TcpListener::bind("127.0.0.1:0").await?;
    let server_addr = listener.local_addr()?;

    let server_task = compio::runtime::spawn(async move {
        let (stream, _) = listener.accept().await?;
        let rep_socket = RepSocket::new(stream).await?;

        // Echo back whatever arrives, correlator frame included
        let req = rep_socket.recv().await?.expect("Should receive");
        rep_socket.send(req).await?;

        Ok::<(), io::Error>(())
    });

    compio::time::sleep(std::time::Duration::from_millis(50)).await;

    let stream = compio::net::TcpStream::connect(server_addr).await?;
    let mut options = SocketOptions::default();
    options.req_correlate = true;
    let req_socket = ReqSocket::with_options(stream, options).await?;

    // Correlator frame is prepended automatically on send
    req_socket.send(vec![Bytes::from("payload")]).await?;

    // ... and validated/stripped automatically on recv
    let reply = req_socket.recv().await?.expect("Should receive");

    assert_eq!(reply.len(), 1);
    assert_eq!(reply[0], Bytes::from("payload"));

    server_task.await?;
    Ok(())
}
