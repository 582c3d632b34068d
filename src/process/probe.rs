//! Readiness probing for spawned processes
//!
//! Polls a port or an HTTP endpoint until the external process answers. Every
//! wait is bounded by a caller-supplied timeout.

use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::process::Child;
use tracing::{debug, info, trace};

use crate::{Error, Result};

/// Delay between two readiness attempts
pub const PROBE_INTERVAL: Duration = Duration::from_millis(1);

/// Upper bound of a single TCP connect or HTTP request while probing
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(1);

async fn port_accepts(host: &str, port: u16) -> bool {
    matches!(
        tokio::time::timeout(ATTEMPT_TIMEOUT, TcpStream::connect((host, port))).await,
        Ok(Ok(_))
    )
}

/// Fail with `PortInUse` when anything already listens on `host:port`
pub async fn check_port_available(host: &str, port: u16) -> Result<()> {
    if port_accepts(host, port).await {
        return Err(Error::port_in_use(format!(
            "{}:{} is already used by another process",
            host, port
        )));
    }
    Ok(())
}

/// Wait until `child` runs and `url` answers.
///
/// A 2xx answer is required unless `ignore_http_errors` is set, in which case
/// any HTTP response proves the server is up. Returns `ProcessExited` as soon as
/// the child dies and `DriverStartTimeout` once `timeout` has elapsed.
pub async fn wait_until_ready(
    child: &mut Child,
    url: &str,
    ignore_http_errors: bool,
    timeout: Duration,
) -> Result<()> {
    // Readiness is about this host:port, never an intermediary
    let client = reqwest::Client::builder()
        .timeout(ATTEMPT_TIMEOUT)
        .no_proxy()
        .build()?;
    let started = Instant::now();

    loop {
        ensure_alive(child, url)?;

        match client.get(url).send().await {
            Ok(response) if ignore_http_errors || response.status().is_success() => {
                // Something answered; make sure it was our process.
                ensure_alive(child, url)?;
                info!("{} ready after {:?}", url, started.elapsed());
                return Ok(());
            }
            Ok(response) => {
                debug!("{} answered {} while starting", url, response.status());
            }
            Err(e) => {
                trace!("{} not ready: {}", url, e);
            }
        }

        if started.elapsed() >= timeout {
            return Err(Error::driver_start_timeout(format!(
                "{} did not answer within {} ms",
                url,
                timeout.as_millis()
            )));
        }

        tokio::time::sleep(PROBE_INTERVAL).await;
    }
}

fn ensure_alive(child: &mut Child, url: &str) -> Result<()> {
    if let Some(status) = child.try_wait()? {
        return Err(Error::process_exited(format!(
            "process behind {} exited with {}",
            url, status
        )));
    }
    Ok(())
}

/// Wait until nothing listens on `host:port` anymore
pub async fn wait_until_port_available(host: &str, port: u16, timeout: Duration) -> Result<()> {
    let started = Instant::now();

    while port_accepts(host, port).await {
        if started.elapsed() >= timeout {
            return Err(Error::timeout(format!(
                "Port {}:{} still in use after {} ms",
                host,
                port,
                timeout.as_millis()
            )));
        }
        tokio::time::sleep(PROBE_INTERVAL).await;
    }

    debug!("{}:{} released", host, port);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_free_port_is_available() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        assert!(check_port_available("127.0.0.1", port).await.is_ok());
    }

    #[tokio::test]
    async fn test_bound_port_is_in_use() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let result = check_port_available("127.0.0.1", port).await;
        assert!(matches!(result, Err(Error::PortInUse(_))));
    }

    #[tokio::test]
    async fn test_wait_until_port_available_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let result = wait_until_port_available("127.0.0.1", port, Duration::from_millis(50)).await;
        assert!(result.unwrap_err().is_timeout());
    }

    #[tokio::test]
    async fn test_wait_until_port_available_after_release() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            drop(listener);
        });

        wait_until_port_available("127.0.0.1", port, Duration::from_secs(5))
            .await
            .unwrap();
    }
}
