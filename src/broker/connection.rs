//! Broker TCP connection implementation
//!
//! A reconnecting RESP2 client over a plain TCP stream. Every operation
//! runs under the shared retry policy; a connection-level fault drops the
//! stream so the next attempt dials fresh.

use async_trait::async_trait;
use bytes::BytesMut;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::resp::{decode_value, encode_command, RespValue};
use super::retry::RetryPolicy;
use super::traits::Broker;
use crate::{Error, Result};

/// Server-side script for the atomic free->busy move. Runs as one
/// indivisible step on the broker, so racing clients can never pop the
/// same member.
const POP_MOVE_SCRIPT: &str =
    "local id = redis.call('SPOP', KEYS[1]) \
     if id then redis.call('SADD', KEYS[2], id) end \
     return id";

/// RESP2 broker client over TCP
#[derive(Debug)]
pub struct RespBroker {
    /// Broker address (host:port)
    addr: String,
    /// Deadline for one request/reply round trip
    response_timeout: Duration,
    /// Retry policy shared by all operations
    retry: RetryPolicy,
    /// Current connection, if any
    stream: Mutex<Option<BufStream<TcpStream>>>,
}

impl RespBroker {
    /// Create a new broker client. Does not dial; the first operation does.
    pub fn new(addr: impl Into<String>, response_timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let addr = addr.into();
        if addr.is_empty() {
            return Err(Error::configuration("Broker address must not be empty"));
        }
        Ok(Self {
            addr,
            response_timeout,
            retry,
            stream: Mutex::new(None),
        })
    }

    /// Create a broker client from configuration
    pub fn from_config(config: &crate::config::Config) -> Result<Self> {
        config.validate()?;
        Self::new(
            config.broker_addr.clone(),
            config.response_timeout(),
            RetryPolicy::new(config.retry_max_attempts, config.retry_base_backoff()),
        )
    }

    /// One command round trip with reconnect-on-demand. A connection-level
    /// failure tears the stream down so the retry layer dials fresh.
    async fn execute(&self, args: &[&[u8]], deadline: Duration) -> Result<RespValue> {
        let mut guard = self.stream.lock().await;

        if guard.is_none() {
            debug!("Dialing broker at {}", self.addr);
            let stream = TcpStream::connect(&self.addr)
                .await
                .map_err(|e| Error::transport(format!("Failed to connect to broker: {}", e)))?;
            *guard = Some(BufStream::new(stream));
            info!("Broker connection established to {}", self.addr);
        }

        let stream = guard.as_mut().ok_or_else(|| Error::internal("Broker stream missing"))?;

        let mut buf = BytesMut::new();
        encode_command(args, &mut buf);

        let round_trip = async {
            stream
                .write_all(&buf)
                .await
                .map_err(|e| Error::transport(format!("Broker write failed: {}", e)))?;
            stream
                .flush()
                .await
                .map_err(|e| Error::transport(format!("Broker flush failed: {}", e)))?;
            decode_value(stream).await
        };

        let value = match tokio::time::timeout(deadline, round_trip).await {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                // Stream state is unknown after an I/O fault
                *guard = None;
                return Err(e);
            }
            Err(_) => {
                *guard = None;
                return Err(Error::broker_timeout(format!(
                    "No reply from broker within {:?}",
                    deadline
                )));
            }
        };

        if let RespValue::Error(msg) = value {
            // The broker executed the call and rejected it; not retriable
            return Err(Error::protocol(msg));
        }

        Ok(value)
    }

    /// Run a command under the retry policy with the standard deadline
    async fn command(&self, args: &[&[u8]]) -> Result<RespValue> {
        self.retry
            .run(|| self.execute(args, self.response_timeout))
            .await
    }
}

#[async_trait]
impl Broker for RespBroker {
    async fn set_members(&self, key: &str) -> Result<Vec<String>> {
        let value = self.command(&[b"SMEMBERS", key.as_bytes()]).await?;
        match value {
            RespValue::Array(items) => items.into_iter().map(|v| v.into_string()).collect(),
            RespValue::Null => Ok(Vec::new()),
            other => Err(Error::protocol(format!(
                "Expected array reply from SMEMBERS, got {:?}",
                other
            ))),
        }
    }

    async fn set_len(&self, key: &str) -> Result<usize> {
        let n = self.command(&[b"SCARD", key.as_bytes()]).await?.into_integer()?;
        Ok(n.max(0) as usize)
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<bool> {
        let n = self
            .command(&[b"SADD", key.as_bytes(), member.as_bytes()])
            .await?
            .into_integer()?;
        Ok(n > 0)
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<bool> {
        let n = self
            .command(&[b"SREM", key.as_bytes(), member.as_bytes()])
            .await?
            .into_integer()?;
        Ok(n > 0)
    }

    async fn pop_move(&self, from: &str, to: &str) -> Result<Option<String>> {
        let value = self
            .command(&[
                b"EVAL",
                POP_MOVE_SCRIPT.as_bytes(),
                b"2",
                from.as_bytes(),
                to.as_bytes(),
            ])
            .await?;
        match value {
            RespValue::Null => Ok(None),
            other => Ok(Some(other.into_string()?)),
        }
    }

    async fn push(&self, queue: &str, payload: &str) -> Result<()> {
        self.command(&[b"RPUSH", queue.as_bytes(), payload.as_bytes()])
            .await?
            .into_integer()?;
        Ok(())
    }

    async fn blocking_pop(&self, queue: &str, timeout: Duration) -> Result<Option<String>> {
        // BLPOP blocks on the broker side; give the round trip a grace
        // margin past the requested wait so the server timeout fires first.
        let secs = format!("{:.3}", timeout.as_secs_f64().max(0.001));
        let deadline = timeout + self.response_timeout;

        let args: [&[u8]; 3] = [b"BLPOP", queue.as_bytes(), secs.as_bytes()];
        let value = self
            .retry
            .run(|| self.execute(&args, deadline))
            .await?;

        match value {
            RespValue::Null => Ok(None),
            RespValue::Array(mut items) if items.len() == 2 => {
                let payload = items.pop().ok_or_else(|| Error::internal("BLPOP reply underflow"))?;
                Ok(Some(payload.into_string()?))
            }
            other => Err(Error::protocol(format!(
                "Expected [key, value] reply from BLPOP, got {:?}",
                other
            ))),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.command(&[b"DEL", key.as_bytes()]).await?.into_integer()?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let value = self.command(&[b"PING"]).await?;
        match value.as_str() {
            Some("PONG") => Ok(()),
            _ => Err(Error::protocol(format!("Unexpected PING reply: {:?}", value))),
        }
    }
}
