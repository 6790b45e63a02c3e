use std::process::Command;
use std::time::Duration;
use tokio::net::TcpListener;

pub async fn get_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

pub async fn wait_for_server(port: u16) -> bool {
    let url = format!("http://127.0.0.1:{port}/healthz");
    for _ in 0..30 {
        if reqwest::get(&url).await.is_ok() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    false
}

pub fn cargo_bin(name: &str) -> Command {
    assert_eq!(name, "authz-sidecar");
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_authz-sidecar"));
    cmd.env("RUST_LOG", "debug");
    cmd
}
