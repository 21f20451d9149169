// mockSFTP State Machines + Observers
// author: kodeholic
//
// 서버/클라이언트 라이프사이클을 상태 머신으로 관리
// can_transition_to()로 허용된 전이만 가능하게 강제
//
// 서버:
//   Starting → Listening → (ProbeSucceeded | ProbeFailed) → Blocked
//     → Closing → Stopped
//
// 클라이언트:
//   Idle → TcpConnecting → Authenticating → Authenticated
//     → ChannelOpening → SftpReady → Transferring → Disconnecting → Disconnected
//
//   어느 상태에서든 → Closing/Disconnecting, Error 전이 가능

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum ServerState {
    Starting,
    Listening,
    ProbeSucceeded,
    ProbeFailed,
    Blocked,
    Closing,
    Stopped,
    Error {
        state: Box<ServerState>,
        message: String,
    },
}

impl ServerState {
    pub fn can_transition_to(&self, next: &ServerState) -> bool {
        use ServerState::*;
        match (self, next) {
            (Stopped, _) => false,
            (Starting, Listening)
            | (Listening, ProbeSucceeded)
            | (Listening, ProbeFailed)
            | (Listening, Blocked)
            | (ProbeSucceeded, Blocked)
            | (ProbeFailed, Blocked)
            | (_, Closing)
            | (Closing, Stopped)
            | (_, Error { .. }) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    Idle,
    TcpConnecting,
    Authenticating,
    Authenticated,
    ChannelOpening,
    SftpReady,
    Transferring,
    Disconnecting,
    Disconnected,
    Error {
        state: Box<ConnectionState>,  // 에러 발생 시점의 상태
        message: String,
    },
}

impl ConnectionState {
    pub fn can_transition_to(&self, next: &ConnectionState) -> bool {
        use ConnectionState::*;
        match (self, next) {
            (Disconnected, _) => false,
            (Idle, TcpConnecting)
            | (TcpConnecting, Authenticating)
            | (Authenticating, Authenticated)
            | (Authenticated, ChannelOpening)
            | (ChannelOpening, SftpReady)
            | (SftpReady, Transferring)
            | (Transferring, SftpReady)
            | (_, Disconnecting)
            | (Disconnecting, Disconnected)
            | (_, Error { .. }) => true,
            _ => false,
        }
    }
}

/// 서버 상태 변경 알림
///
/// CLI: println으로 상태 출력, 테스트: 전이 기록
pub trait ServerObserver: Send + Sync {
    fn on_state_changed(&self, prev: &ServerState, next: &ServerState);
}

/// 클라이언트 상태 변경 알림
pub trait ConnectionObserver: Send + Sync {
    fn on_state_changed(&self, prev: &ConnectionState, next: &ConnectionState);
}

/// 아무것도 하지 않는 observer (tracing 로그만 남김)
pub struct TracingObserver;

impl ServerObserver for TracingObserver {
    fn on_state_changed(&self, prev: &ServerState, next: &ServerState) {
        tracing::debug!("[server] {:?} → {:?}", prev, next);
    }
}

impl ConnectionObserver for TracingObserver {
    fn on_state_changed(&self, prev: &ConnectionState, next: &ConnectionState) {
        tracing::debug!("[client] {:?} → {:?}", prev, next);
    }
}

pub(crate) fn invalid_transition<S: std::fmt::Debug>(from: &S, to: &S) -> Error {
    Error::InvalidTransition {
        from: format!("{:?}", from),
        to: format!("{:?}", to),
    }
}

/// 검증된 전이 + observer 통지
pub(crate) struct ServerLifecycle {
    state: ServerState,
    observer: std::sync::Arc<dyn ServerObserver>,
}

impl ServerLifecycle {
    pub(crate) fn new(observer: std::sync::Arc<dyn ServerObserver>) -> Self {
        Self { state: ServerState::Starting, observer }
    }

    pub(crate) fn state(&self) -> &ServerState {
        &self.state
    }

    pub(crate) fn transition(&mut self, next: ServerState) -> Result<()> {
        if !self.state.can_transition_to(&next) {
            return Err(invalid_transition(&self.state, &next));
        }
        let prev = std::mem::replace(&mut self.state, next);
        self.observer.on_state_changed(&prev, &self.state);
        Ok(())
    }

    pub(crate) fn fail(&mut self, message: String) {
        let current = self.state.clone();
        let prev = std::mem::replace(
            &mut self.state,
            ServerState::Error { state: Box::new(current), message },
        );
        self.observer.on_state_changed(&prev, &self.state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_happy_path_is_allowed() {
        use ServerState::*;
        let path = [Starting, Listening, ProbeSucceeded, Blocked, Closing, Stopped];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(&pair[1]), "{:?} → {:?}", pair[0], pair[1]);
        }
        assert!(Listening.can_transition_to(&ProbeFailed));
        assert!(ProbeFailed.can_transition_to(&Blocked));
    }

    #[test]
    fn server_rejects_skipping_listen() {
        use ServerState::*;
        assert!(!Starting.can_transition_to(&Blocked));
        assert!(!Starting.can_transition_to(&ProbeSucceeded));
        assert!(!Blocked.can_transition_to(&Listening));
        assert!(!Stopped.can_transition_to(&Closing));
        assert!(Starting.can_transition_to(&Closing));
    }

    #[test]
    fn client_transfer_returns_to_ready() {
        use ConnectionState::*;
        assert!(SftpReady.can_transition_to(&Transferring));
        assert!(Transferring.can_transition_to(&SftpReady));
        assert!(!Idle.can_transition_to(&SftpReady));
        assert!(Transferring.can_transition_to(&Disconnecting));
    }

    #[test]
    fn client_disconnected_is_terminal() {
        use ConnectionState::*;
        let failed = Error { state: Box::new(Transferring), message: "x".into() };
        assert!(failed.can_transition_to(&Disconnecting));
        assert!(Disconnecting.can_transition_to(&Disconnected));
        assert!(!Disconnected.can_transition_to(&Disconnecting));
        assert!(!Disconnected.can_transition_to(&TcpConnecting));
        assert!(!Disconnected.can_transition_to(&Error { state: Box::new(Disconnected), message: "x".into() }));
    }

    #[test]
    fn lifecycle_reports_transitions() {
        use std::sync::{Arc, Mutex};

        struct Recorder(Mutex<Vec<ServerState>>);
        impl ServerObserver for Recorder {
            fn on_state_changed(&self, _prev: &ServerState, next: &ServerState) {
                self.0.lock().unwrap().push(next.clone());
            }
        }

        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let mut lifecycle = ServerLifecycle::new(recorder.clone());
        lifecycle.transition(ServerState::Listening).unwrap();
        assert!(lifecycle.transition(ServerState::Stopped).is_err());
        lifecycle.fail("boom".to_string());

        let seen = recorder.0.lock().unwrap().clone();
        assert_eq!(seen[0], ServerState::Listening);
        assert!(matches!(&seen[1], ServerState::Error { message, .. } if message == "boom"));
    }
}
