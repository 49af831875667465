//! Session application: the bridge's side of the engine callback contract

use super::engine::{Application, SessionSender};
use super::handoff::SessionHandoff;
use super::requests::security_definition_request;
use super::router::{MessageRouter, RouteError};
use crate::request_id::{RequestCategory, RequestIds};
use bridge_config::SessionCredentials;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};
use types::fix::tags;
use types::{Message, MessageRejectError, MsgType, SessionId};

/// Lifecycle of the counterparty session as reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No callback received yet
    Pending,
    Created,
    LoggedOn,
    LoggedOut,
}

pub struct SessionApplication {
    credentials: SessionCredentials,
    router: MessageRouter,
    handoff: SessionHandoff,
    sender: Arc<dyn SessionSender>,
    ids: Arc<RequestIds>,
    state: Mutex<SessionState>,
}

impl SessionApplication {
    pub fn new(
        credentials: SessionCredentials,
        router: MessageRouter,
        handoff: SessionHandoff,
        sender: Arc<dyn SessionSender>,
        ids: Arc<RequestIds>,
    ) -> Self {
        Self {
            credentials,
            router,
            handoff,
            sender,
            ids,
            state: Mutex::new(SessionState::Pending),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    pub fn handoff(&self) -> &SessionHandoff {
        &self.handoff
    }

    fn transition(&self, next: SessionState, session: &SessionId) {
        let previous = std::mem::replace(&mut *self.state.lock(), next);
        debug!(session = %session, ?previous, ?next, "Session state changed");
    }

    fn request_definitions(&self, session: &SessionId) {
        let req_id = self.ids.next_field(RequestCategory::SecurityDefinition);
        let request =
            security_definition_request(&req_id, &self.credentials.security_request_type);

        match self.sender.send_to_session(request, session) {
            Ok(()) => info!(session = %session, req_id = %req_id, "Security definition request sent"),
            Err(e) => warn!(
                session = %session,
                req_id = %req_id,
                "Failed to send security definition request: {}",
                e
            ),
        }
    }
}

impl Application for SessionApplication {
    fn on_create(&self, session: &SessionId) {
        info!(session = %session, "Session created");
        self.transition(SessionState::Created, session);
    }

    fn on_logon(&self, session: &SessionId) {
        info!(session = %session, "Logon");
        self.transition(SessionState::LoggedOn, session);
        self.handoff.publish(session.clone());
        self.request_definitions(session);
    }

    fn on_logout(&self, session: &SessionId) {
        info!(session = %session, "Logout");
        if self.handoff.clear(session) {
            self.transition(SessionState::LoggedOut, session);
        } else {
            debug!(session = %session, "Logout for a session that is no longer active");
        }
    }

    fn to_admin(&self, message: &mut Message, _session: &SessionId) {
        message
            .header
            .set(tags::PASSWORD, self.credentials.password.as_str());
        if let Some(username) = &self.credentials.username {
            message.header.set(tags::USERNAME, username.as_str());
        }
    }

    fn to_app(&self, message: &mut Message, _session: &SessionId) {
        if let Some(client_id) = &self.credentials.client_id {
            message.header.set(tags::CLIENT_ID, client_id.as_str());
        }
    }

    fn from_admin(
        &self,
        message: &Message,
        session: &SessionId,
    ) -> Result<(), MessageRejectError> {
        let body = &message.body;
        match message.msg_type() {
            MsgType::Reject => warn!(
                session = %session,
                ref_seq_num = body.get(tags::REF_SEQ_NUM).unwrap_or_default(),
                reason = body.get(tags::SESSION_REJECT_REASON).unwrap_or_default(),
                text = body.get(tags::TEXT).unwrap_or_default(),
                "Session-level reject received"
            ),
            MsgType::Logout => info!(
                session = %session,
                text = body.get(tags::TEXT).unwrap_or_default(),
                "Counterparty logout"
            ),
            other => trace!(session = %session, msg_type = %other, "Admin message"),
        }
        Ok(())
    }

    fn from_app(&self, message: &Message, session: &SessionId) -> Result<(), MessageRejectError> {
        debug!(session = %session, "Inbound: {}", message);
        match self.router.dispatch(message, session) {
            Ok(()) => Ok(()),
            Err(RouteError::UnsupportedMessageType(msg_type)) => {
                debug!(session = %session, %msg_type, "No handler, message acknowledged");
                Ok(())
            }
            Err(RouteError::Reject(reject)) => {
                warn!(session = %session, "Rejecting inbound message: {}", reject);
                Err(reject)
            }
        }
    }
}
