use log::debug;
use mailin_embedded::{Handler, Server, SslConfig};
use std::{net::IpAddr, sync::Arc, time::Duration};
use tokio::{
    sync::watch::{self, error::RecvError, Receiver, Sender},
    time::timeout,
};

pub const SMTP_PORT: u16 = 4567;
pub const POISONED_SMTP_PORT: u16 = 4568;

const SERVER_NAME: &str = "acosfootballacademy.com";

/// A message as accepted by the fake server: the SMTP envelope recipients and the raw DATA.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReceivedMail {
    pub envelope_to: Vec<String>,
    pub content: String,
}

#[derive(Clone)]
struct RecordingHandler {
    envelope_to: Vec<String>,
    data: Vec<u8>,
    sender: Arc<Sender<ReceivedMail>>,
}

impl Handler for RecordingHandler {
    fn data_start(
        &mut self,
        _domain: &str,
        from: &str,
        _is8bit: bool,
        to: &[String],
    ) -> mailin_embedded::Response {
        debug!("Receiving mail from {from} to {to:?}");
        self.envelope_to = to.to_vec();
        self.data.clear();
        mailin_embedded::response::OK
    }

    fn data(&mut self, buf: &[u8]) -> std::io::Result<()> {
        debug!("Got data:\n{}", String::from_utf8_lossy(buf));
        self.data.extend(buf);
        Ok(())
    }

    fn data_end(&mut self) -> mailin_embedded::Response {
        let mail = ReceivedMail {
            envelope_to: std::mem::take(&mut self.envelope_to),
            content: String::from_utf8_lossy(&std::mem::take(&mut self.data)).into_owned(),
        };
        let _ = self.sender.send(mail);
        mailin_embedded::response::OK
    }

    fn auth_plain(
        &mut self,
        authorization_id: &str,
        authentication_id: &str,
        _password: &str,
    ) -> mailin_embedded::Response {
        debug!("Got authentication data {authorization_id}, {authentication_id}");
        mailin_embedded::response::AUTH_OK
    }
}

/// SMTP server on [`SMTP_PORT`] which accepts everything and publishes the last mail it got.
pub struct FakeSmtpServer(
    std::sync::Mutex<Option<Server<RecordingHandler>>>,
    tokio::sync::Mutex<Receiver<ReceivedMail>>,
);

impl FakeSmtpServer {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(ReceivedMail::default());
        let handler = RecordingHandler {
            envelope_to: Vec::new(),
            data: Vec::new(),
            sender: Arc::new(sender),
        };
        let mut server = Server::new(handler);
        server
            .with_name(SERVER_NAME)
            .with_ssl(SslConfig::None)
            .unwrap()
            .with_addr(format!("0.0.0.0:{SMTP_PORT}"))
            .unwrap();
        Self(
            std::sync::Mutex::new(Some(server)),
            tokio::sync::Mutex::new(receiver),
        )
    }

    /// Starts serving on a background thread. Subsequent calls do nothing.
    pub fn start(&self) {
        let mut guard = self.0.lock().unwrap();
        if let Some(server) = guard.take() {
            std::thread::spawn(move || {
                let _ = server.serve();
            });
        }
    }

    /// Waits for the next mail accepted after the previous call (or after [`Self::flush`]).
    pub async fn last_mail(&self) -> Result<ReceivedMail, RecvError> {
        let mut receiver = self.1.lock().await;
        receiver.changed().await?;
        let mail = receiver.borrow_and_update().clone();
        drop(receiver);
        Ok(mail)
    }

    /// Discards a mail left over from an earlier test, if any.
    pub async fn flush(&self) {
        let mut receiver = self.1.lock().await;
        let _ = timeout(Duration::from_millis(100), receiver.changed()).await;
        receiver.borrow_and_update();
    }

    pub fn setup_environment() {
        std::env::set_var("SMTP_URL", Self::url());
    }

    pub fn url() -> String {
        format!("smtp://localhost:{SMTP_PORT}")
    }
}

impl Default for FakeSmtpServer {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
struct PoisonedSmtpHandler;

impl Handler for PoisonedSmtpHandler {
    fn helo(&mut self, _ip: IpAddr, _domain: &str) -> mailin_embedded::Response {
        mailin_embedded::response::INTERNAL_ERROR
    }

    fn mail(&mut self, _ip: IpAddr, _domain: &str, _from: &str) -> mailin_embedded::Response {
        mailin_embedded::response::INTERNAL_ERROR
    }
}

/// Starts an SMTP server on [`POISONED_SMTP_PORT`] which rejects every session. Only the first
/// call binds the port; later calls fail to bind on their thread and are harmless.
pub fn start_poisoned_smtp_server() {
    let handler = PoisonedSmtpHandler;
    let mut server = Server::new(handler);
    server
        .with_name(SERVER_NAME)
        .with_ssl(SslConfig::None)
        .unwrap()
        .with_addr(format!("0.0.0.0:{POISONED_SMTP_PORT}"))
        .unwrap();
    std::thread::spawn(move || {
        let _ = server.serve();
    });
}

pub fn poisoned_url() -> String {
    format!("smtp://localhost:{POISONED_SMTP_PORT}")
}
