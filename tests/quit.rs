// Process lifecycle: the console exits on `quit` while stdin stays open
use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn exits_promptly_on_quit_with_stdin_open() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_growbox-console"))
        .env("GROWBOX__SERVICE__BASE_URL", "http://127.0.0.1:1")
        .env("RUST_LOG", "off")
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let mut stdin = child.stdin.take().unwrap();
    stdin.write_all(b"quit\n").unwrap();
    stdin.flush().unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break Some(status);
        }
        if Instant::now() > deadline {
            break None;
        }
        thread::sleep(Duration::from_millis(50));
    };

    // Held until here so the pipe is still open while we wait.
    drop(stdin);
    if status.is_none() {
        let _ = child.kill();
        let _ = child.wait();
    }
    let status = status.expect("console did not exit after quit");
    assert!(status.success());
}
