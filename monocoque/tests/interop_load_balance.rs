use monocoque::zmq::RouterSocket;
use bytes::Bytes;
use std::thread;

// TODO: These interop tests hang due to compio runtime not exiting cleanly in test harness
#[test]
#[ignore = "compio runtime lifecycle issues in test harness"]
fn test_router_load_balancer_basic() {
    let (ready_tx, ready_rx) = std::sync::mpsc::channel();

    thread::spawn(move || {
        compio::runtime::Runtime::new().unwrap().block_on(async {
            let listener = compio::net::TcpListener::bind("127.0.0.1:5559").await.unwrap();
            ready_tx.send(()).unwrap();

            let (stream, _) = listener.accept().await.unwrap();

            let mut router = RouterSocket::from_stream(stream).await.unwrap();

            let msg = router.recv().await.unwrap();
            eprintln!(
                "[Router] Received from: {:?}",
                std::str::from_utf8(&msg[0]).unwrap_or("???")
            );

            router.send(vec![
                msg[0].clone(), // Return to sender
                Bytes::from_static(b"Response from Router"),
            ]).await.unwrap();

            drop(router);
        });
    });

    ready_rx.recv().unwrap();

    let ctx = zmq::Context::new();
    let dealer = ctx.socket(zmq::DEALER).unwrap();
    dealer.set_identity(b"WORKER_1").unwrap();
    dealer.connect("tcp://127.0.0.1:5559").unwrap();

    dealer.send("Task from worker", 0).unwrap();

    let response = dealer.recv_string(0).unwrap().unwrap();
    assert_eq!(response, "Response from Router");
}
