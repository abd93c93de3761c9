use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::{BackendError, RealtimeBackend};
use crate::hub::ValueSnapshot;
use crate::path::DbPath;
use crate::wire::{decode_line, encode_line, ClientFrame, ServerFrame};
use crate::PlayerId;

type Routes = Arc<Mutex<HashMap<DbPath, Vec<Sender<ValueSnapshot>>>>>;

/// Backend speaking the JSON-lines protocol to a `presence_server`.
pub struct TcpBackend {
    writer: TcpStream,
    replies: Receiver<ServerFrame>,
    routes: Routes,
}

impl TcpBackend {
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, BackendError> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let reader_stream = stream.try_clone()?;
        let (reply_tx, reply_rx) = mpsc::channel();
        let routes = Routes::default();
        let reader_routes = Arc::clone(&routes);
        thread::Builder::new()
            .name("presence-client-reader".to_string())
            .spawn(move || read_server_frames(reader_stream, reply_tx, reader_routes))?;

        Ok(Self {
            writer: stream,
            replies: reply_rx,
            routes,
        })
    }

    fn request(&mut self, frame: &ClientFrame) -> Result<ServerFrame, BackendError> {
        let line = encode_line(frame)?;
        self.writer.write_all(line.as_bytes())?;
        match self.replies.recv() {
            Ok(ServerFrame::Error { message }) => Err(BackendError::Rejected { message }),
            Ok(reply) => Ok(reply),
            Err(_) => Err(BackendError::Closed),
        }
    }

    fn expect_ok(&mut self, frame: &ClientFrame) -> Result<(), BackendError> {
        match self.request(frame)? {
            ServerFrame::Ok => Ok(()),
            other => Err(BackendError::UnexpectedReply {
                request: frame.op_name(),
                reply: format!("{other:?}"),
            }),
        }
    }
}

impl RealtimeBackend for TcpBackend {
    fn sign_in_anonymously(&mut self) -> Result<PlayerId, BackendError> {
        let frame = ClientFrame::SignIn;
        match self.request(&frame)? {
            ServerFrame::SignedIn { uid } => Ok(PlayerId::new(uid)),
            other => Err(BackendError::UnexpectedReply {
                request: frame.op_name(),
                reply: format!("{other:?}"),
            }),
        }
    }

    fn set(&mut self, path: &DbPath, value: Value) -> Result<(), BackendError> {
        self.expect_ok(&ClientFrame::Set {
            path: path.to_string(),
            value,
        })
    }

    fn on_disconnect_remove(&mut self, path: &DbPath) -> Result<(), BackendError> {
        self.expect_ok(&ClientFrame::OnDisconnectRemove {
            path: path.to_string(),
        })
    }

    fn subscribe(&mut self, path: &DbPath) -> Result<Receiver<ValueSnapshot>, BackendError> {
        let (tx, rx) = mpsc::channel();
        lock_routes(&self.routes)
            .entry(path.clone())
            .or_default()
            .push(tx);

        let result = self.expect_ok(&ClientFrame::Subscribe {
            path: path.to_string(),
        });
        if let Err(error) = result {
            lock_routes(&self.routes).remove(path);
            return Err(error);
        }
        Ok(rx)
    }
}

impl Drop for TcpBackend {
    fn drop(&mut self) {
        let _ = self.writer.shutdown(Shutdown::Both);
    }
}

fn read_server_frames(stream: TcpStream, replies: Sender<ServerFrame>, routes: Routes) {
    let reader = BufReader::new(stream);
    for line in reader.lines() {
        let Ok(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        match decode_line::<ServerFrame>(&line) {
            Ok(ServerFrame::Value { path, data }) => route_value(&routes, &path, data),
            Ok(reply) => {
                if replies.send(reply).is_err() {
                    break;
                }
            }
            Err(error) => warn!(error = %error, "presence_client_bad_frame"),
        }
    }

    // Dropping the senders ends every subscription.
    lock_routes(&routes).clear();
    debug!("presence_client_reader_stopped");
}

fn route_value(routes: &Routes, raw_path: &str, data: Value) {
    let path = match DbPath::parse(raw_path) {
        Ok(path) => path,
        Err(error) => {
            warn!(path = raw_path, error = %error, "presence_client_bad_value_path");
            return;
        }
    };
    let mut routes = lock_routes(routes);
    let Some(sinks) = routes.get_mut(&path) else {
        return;
    };
    let snapshot = ValueSnapshot { path, value: data };
    sinks.retain(|sink| sink.send(snapshot.clone()).is_ok());
}

fn lock_routes(routes: &Routes) -> MutexGuard<'_, HashMap<DbPath, Vec<Sender<ValueSnapshot>>>> {
    routes.lock().unwrap_or_else(PoisonError::into_inner)
}
