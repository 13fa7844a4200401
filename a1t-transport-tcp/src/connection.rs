/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! One TCP connection per target, shared by one-shot calls and long-lived sessions.
//!
//! A single reader task routes every incoming frame: results of one-shot kinds go
//! to the call waiting on their request id, frames of long-lived kinds go to the
//! session opened for that kind. When the peer goes away every waiting call fails
//! and every session ends.

use crate::frame::{Frame, MAX_FRAME_LENGTH};
use a1t_streamer::message::{MessageBody, RequestMessage, ResultMessage, RpcKind, SessionMode};
use a1t_streamer::observability::events;
use a1t_streamer::southbound::{RemoteSession, TargetTransport};
use a1t_streamer::A1Error;
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const COMPONENT: &str = "tcp_transport";

type FrameSink = SplitSink<Framed<TcpStream, LinesCodec>, String>;
type FrameSource = SplitStream<Framed<TcpStream, LinesCodec>>;

struct Connection {
    target_id: String,
    sink: tokio::sync::Mutex<FrameSink>,
    pending: Mutex<HashMap<String, oneshot::Sender<ResultMessage>>>,
    sessions: Mutex<HashMap<RpcKind, mpsc::UnboundedSender<MessageBody>>>,
    closed: CancellationToken,
}

impl Connection {
    fn pending(&self) -> MutexGuard<'_, HashMap<String, oneshot::Sender<ResultMessage>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<RpcKind, mpsc::UnboundedSender<MessageBody>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn closed_error(&self) -> A1Error {
        A1Error::transport(format!("connection to {} closed", self.target_id))
    }

    /// Fails every waiting call and ends every session.
    fn shutdown(&self) {
        self.closed.cancel();
        self.pending().clear();
        self.sessions().clear();
    }

    async fn write(&self, frame: Frame) -> Result<(), A1Error> {
        if self.closed.is_cancelled() {
            return Err(self.closed_error());
        }
        let line = frame.encode()?;
        let written = self.sink.lock().await.send(line).await;
        written.map_err(|err| {
            self.shutdown();
            A1Error::transport(format!("writing to {} failed: {err}", self.target_id))
        })
    }

    async fn read_loop(self: Arc<Self>, mut source: FrameSource) {
        loop {
            let line = tokio::select! {
                _ = self.closed.cancelled() => break,
                line = source.next() => line,
            };

            match line {
                Some(Ok(line)) => self.route(&line),
                Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                    warn!(
                        event = events::TRANSPORT_FRAME_INVALID,
                        component = COMPONENT,
                        target_id = self.target_id.as_str(),
                        max_length = MAX_FRAME_LENGTH,
                        "oversized frame discarded"
                    );
                }
                Some(Err(LinesCodecError::Io(err))) => {
                    warn!(
                        event = events::TRANSPORT_DISCONNECTED,
                        component = COMPONENT,
                        target_id = self.target_id.as_str(),
                        err = %err,
                        "reading from target failed"
                    );
                    break;
                }
                None => break,
            }
        }

        self.shutdown();
        info!(
            event = events::TRANSPORT_DISCONNECTED,
            component = COMPONENT,
            target_id = self.target_id.as_str(),
            "connection closed"
        );
    }

    fn route(&self, line: &str) {
        let Frame { rpc, body } = match Frame::decode(line) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(
                    event = events::TRANSPORT_FRAME_INVALID,
                    component = COMPONENT,
                    target_id = self.target_id.as_str(),
                    err = %err,
                    "undecodable frame dropped"
                );
                return;
            }
        };

        match (rpc.session_mode(), body) {
            (SessionMode::OneShot, MessageBody::Result(result)) => {
                let waiter = self.pending().remove(&result.header.request_id);
                match waiter {
                    // the caller may have given up already
                    Some(waiter) => {
                        let _ = waiter.send(result);
                    }
                    None => debug!(
                        event = events::TRANSPORT_FRAME_UNROUTED,
                        component = COMPONENT,
                        target_id = self.target_id.as_str(),
                        rpc = %rpc,
                        request_id = result.header.request_id.as_str(),
                        "result for no waiting call"
                    ),
                }
            }
            (SessionMode::LongLived, body) => {
                let delivered = self
                    .sessions()
                    .get(&rpc)
                    .is_some_and(|session| session.send(body).is_ok());
                if !delivered {
                    debug!(
                        event = events::TRANSPORT_FRAME_UNROUTED,
                        component = COMPONENT,
                        target_id = self.target_id.as_str(),
                        rpc = %rpc,
                        "no open session for frame"
                    );
                }
            }
            (SessionMode::OneShot, body) => warn!(
                event = events::TRANSPORT_FRAME_UNROUTED,
                component = COMPONENT,
                target_id = self.target_id.as_str(),
                rpc = %rpc,
                msg_kind = %body.kind(),
                "unexpected frame for one-shot kind"
            ),
        }
    }
}

/// Removes the call's waiter however the call ends.
struct PendingCall<'a> {
    connection: &'a Connection,
    request_id: String,
}

impl Drop for PendingCall<'_> {
    fn drop(&mut self) {
        self.connection.pending().remove(&self.request_id);
    }
}

/// [`TargetTransport`] over a line-framed JSON TCP connection.
pub struct TcpTransport {
    connection: Arc<Connection>,
}

impl TcpTransport {
    pub async fn connect(
        target_id: &str,
        address: &str,
        connect_timeout: Duration,
    ) -> Result<Self, A1Error> {
        let stream = timeout(connect_timeout, TcpStream::connect(address))
            .await
            .map_err(|_| {
                A1Error::transport(format!(
                    "connecting to {target_id} at {address} timed out after {connect_timeout:?}"
                ))
            })?
            .map_err(|err| {
                A1Error::transport(format!(
                    "connecting to {target_id} at {address} failed: {err}"
                ))
            })?;
        // frames are small and latency-bound
        stream.set_nodelay(true).map_err(|err| {
            A1Error::transport(format!("configuring socket to {target_id} failed: {err}"))
        })?;

        let framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_FRAME_LENGTH));
        let (sink, source) = framed.split();
        let connection = Arc::new(Connection {
            target_id: target_id.to_string(),
            sink: tokio::sync::Mutex::new(sink),
            pending: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
            closed: CancellationToken::new(),
        });
        tokio::spawn(connection.clone().read_loop(source));

        Ok(Self { connection })
    }

    pub fn is_closed(&self) -> bool {
        self.connection.closed.is_cancelled()
    }
}

#[async_trait]
impl TargetTransport for TcpTransport {
    async fn call(&self, rpc: RpcKind, request: RequestMessage) -> Result<ResultMessage, A1Error> {
        let connection = self.connection.as_ref();
        let request_id = request.header.request_id.clone();
        let (waiter, reply) = oneshot::channel();
        connection.pending().insert(request_id.clone(), waiter);
        let _pending = PendingCall {
            connection,
            request_id,
        };

        connection
            .write(Frame::new(rpc, MessageBody::Request(request)))
            .await?;

        tokio::select! {
            _ = connection.closed.cancelled() => Err(connection.closed_error()),
            reply = reply => reply.map_err(|_| connection.closed_error()),
        }
    }

    async fn open_session(&self, rpc: RpcKind) -> Result<Arc<dyn RemoteSession>, A1Error> {
        if self.is_closed() {
            return Err(self.connection.closed_error());
        }

        let (route, inbound) = mpsc::unbounded_channel();
        let owned_route = route.downgrade();
        if self.connection.sessions().insert(rpc, route).is_some() {
            debug!(
                component = COMPONENT,
                target_id = self.connection.target_id.as_str(),
                rpc = %rpc,
                "replaced existing session"
            );
        }

        Ok(Arc::new(TcpSession {
            rpc,
            route: owned_route,
            connection: self.connection.clone(),
            inbound: tokio::sync::Mutex::new(inbound),
            closed: self.connection.closed.child_token(),
        }))
    }

    async fn close(&self) {
        self.connection.shutdown();
        // the peer sees end-of-stream once the write half is shut down
        let _ = self.connection.sink.lock().await.close().await;
    }
}

struct TcpSession {
    rpc: RpcKind,
    /// Weak so that replacing the route still ends this session's inbound queue.
    route: mpsc::WeakUnboundedSender<MessageBody>,
    connection: Arc<Connection>,
    inbound: tokio::sync::Mutex<mpsc::UnboundedReceiver<MessageBody>>,
    closed: CancellationToken,
}

#[async_trait]
impl RemoteSession for TcpSession {
    async fn recv(&self) -> Option<MessageBody> {
        let mut inbound = self.inbound.lock().await;
        tokio::select! {
            _ = self.closed.cancelled() => None,
            body = inbound.recv() => body,
        }
    }

    async fn send(&self, body: MessageBody) -> Result<(), A1Error> {
        if self.closed.is_cancelled() {
            return Err(A1Error::transport(format!(
                "{} session to {} closed",
                self.rpc, self.connection.target_id
            )));
        }
        self.connection.write(Frame::new(self.rpc, body)).await
    }

    async fn close(&self) {
        if self.closed.is_cancelled() {
            return;
        }
        self.closed.cancel();

        // a later session for the same kind may own the route by now
        let mut sessions = self.connection.sessions();
        let owned = match (sessions.get(&self.rpc), self.route.upgrade()) {
            (Some(current), Some(route)) => current.same_channel(&route),
            _ => false,
        };
        if owned {
            sessions.remove(&self.rpc);
        }
    }
}
