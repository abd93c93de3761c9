use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use tracing::{debug, info, warn};

use crate::backend::BackendError;
use crate::hub::{HubSession, RealtimeHub, ValueSnapshot};
use crate::path::DbPath;
use crate::wire::{decode_line, encode_line, ClientFrame, ServerFrame};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:46101";

/// Accepts connections forever, one thread per client.
pub fn serve(listener: TcpListener, hub: RealtimeHub) -> io::Result<()> {
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "presence_server_listening");

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => spawn_connection(stream, hub.clone()),
            Err(error) => warn!(error = %error, "presence_accept_failed"),
        }
    }
    Ok(())
}

fn spawn_connection(stream: TcpStream, hub: RealtimeHub) {
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "<unknown>".to_string());
    let thread_peer = peer.clone();
    let spawned = thread::Builder::new()
        .name(format!("presence-conn-{peer}"))
        .spawn(move || {
            info!(peer = %thread_peer, "presence_client_connected");
            if let Err(error) = handle_connection(stream, &hub) {
                debug!(peer = %thread_peer, error = %error, "presence_connection_error");
            }
            info!(peer = %thread_peer, "presence_client_disconnected");
        });
    if let Err(error) = spawned {
        warn!(peer = %peer, error = %error, "presence_connection_spawn_failed");
    }
}

fn handle_connection(stream: TcpStream, hub: &RealtimeHub) -> io::Result<()> {
    stream.set_nodelay(true)?;
    let session = hub.open_session();
    let (frame_tx, frame_rx) = mpsc::channel::<ServerFrame>();
    let writer_stream = stream.try_clone()?;
    let writer = thread::Builder::new()
        .name("presence-writer".to_string())
        .spawn(move || write_frames(writer_stream, frame_rx))?;

    let reader = BufReader::new(stream);
    let mut read_result = Ok(());
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(error) => {
                read_result = Err(error);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let reply = match decode_line::<ClientFrame>(&line) {
            Ok(frame) => {
                let op = frame.op_name();
                apply_client_frame(&session, frame, &frame_tx).unwrap_or_else(|error| {
                    debug!(op, error = %error, "presence_request_rejected");
                    ServerFrame::Error {
                        message: error.to_string(),
                    }
                })
            }
            Err(error) => ServerFrame::Error {
                message: error.to_string(),
            },
        };
        if frame_tx.send(reply).is_err() {
            break;
        }
    }

    session.close();
    drop(frame_tx);
    if let Ok(Err(error)) = writer.join() {
        debug!(error = %error, "presence_writer_stopped_with_error");
    }
    read_result
}

fn apply_client_frame(
    session: &HubSession,
    frame: ClientFrame,
    frames: &Sender<ServerFrame>,
) -> Result<ServerFrame, BackendError> {
    match frame {
        ClientFrame::SignIn => {
            let uid = session.sign_in_anonymously()?;
            Ok(ServerFrame::SignedIn {
                uid: uid.into_string(),
            })
        }
        ClientFrame::Set { path, value } => {
            session.set(&DbPath::parse(&path)?, value)?;
            Ok(ServerFrame::Ok)
        }
        ClientFrame::OnDisconnectRemove { path } => {
            session.on_disconnect_remove(&DbPath::parse(&path)?)?;
            Ok(ServerFrame::Ok)
        }
        ClientFrame::Subscribe { path } => {
            let path = DbPath::parse(&path)?;
            let (tx, rx) = mpsc::channel();
            session.subscribe(&path, tx)?;
            spawn_value_forwarder(rx, frames.clone())?;
            Ok(ServerFrame::Ok)
        }
    }
}

fn spawn_value_forwarder(
    values: Receiver<ValueSnapshot>,
    frames: Sender<ServerFrame>,
) -> io::Result<()> {
    thread::Builder::new()
        .name("presence-forwarder".to_string())
        .spawn(move || {
            for snapshot in values {
                let frame = ServerFrame::Value {
                    path: snapshot.path.to_string(),
                    data: snapshot.value,
                };
                if frames.send(frame).is_err() {
                    break;
                }
            }
        })?;
    Ok(())
}

fn write_frames(mut stream: TcpStream, frames: Receiver<ServerFrame>) -> io::Result<()> {
    for frame in frames {
        let line = encode_line(&frame)
            .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))?;
        stream.write_all(line.as_bytes())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;
    use std::time::Duration;

    use super::*;

    fn start_server() -> (std::net::SocketAddr, RealtimeHub) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        let hub = RealtimeHub::new();
        let server_hub = hub.clone();
        thread::spawn(move || serve(listener, server_hub));
        (addr, hub)
    }

    fn read_frame(reader: &mut BufReader<TcpStream>) -> ServerFrame {
        let mut line = String::new();
        reader.read_line(&mut line).expect("read line");
        decode_line(&line).expect("frame")
    }

    #[test]
    fn malformed_line_gets_error_reply_and_connection_survives() {
        let (addr, _hub) = start_server();
        let mut stream = TcpStream::connect(addr).expect("connect");
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .expect("timeout");
        let mut reader = BufReader::new(stream.try_clone().expect("clone"));

        stream.write_all(b"not json\n").expect("write");
        assert!(matches!(read_frame(&mut reader), ServerFrame::Error { .. }));

        stream.write_all(b"{\"op\":\"sign_in\"}\n").expect("write");
        assert!(matches!(
            read_frame(&mut reader),
            ServerFrame::SignedIn { .. }
        ));
    }

    #[test]
    fn set_before_sign_in_is_rejected() {
        let (addr, _hub) = start_server();
        let mut stream = TcpStream::connect(addr).expect("connect");
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .expect("timeout");
        let mut reader = BufReader::new(stream.try_clone().expect("clone"));

        stream
            .write_all(b"{\"op\":\"set\",\"path\":\"players/x\",\"value\":true}\n")
            .expect("write");
        assert!(matches!(read_frame(&mut reader), ServerFrame::Error { .. }));
    }
}
