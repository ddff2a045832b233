#![no_main]

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::OnceLock;
use std::time::Duration;

use libfuzzer_sys::fuzz_target;
use tokio::io::BufReader;

use uagate::proxy::request::read_request_head;

fn runtime() -> &'static tokio::runtime::Runtime {
    static RUNTIME: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
    RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .expect("build tokio runtime")
    })
}

fuzz_target!(|data: &[u8]| {
    let max_header_bytes = data.len().clamp(1, 16 * 1024);
    let peer = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 12345));

    runtime().block_on(async {
        let mut reader = BufReader::new(data);
        if let Ok(Some(head)) =
            read_request_head(&mut reader, peer, Duration::from_millis(10), max_header_bytes).await
        {
            let _ = head.user_agent();
            let _ = head.encode_for_upstream();
        }
    });
});
