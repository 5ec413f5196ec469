//! Info codes pushed by the exchange on system frames.

/// Server-driven lifecycle signal carried in an `info` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfoCode {
    /// Credentials were rejected for this connection.
    InvalidUser = 20000,
    /// The websocket server is restarting; reconnect.
    ServerRestart = 20051,
    /// Trading engine refresh started; pause all activity.
    MaintenanceStart = 20060,
    /// Trading engine refresh done; resume.
    MaintenanceEnd = 20061,
}

impl InfoCode {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            20000 => Some(InfoCode::InvalidUser),
            20051 => Some(InfoCode::ServerRestart),
            20060 => Some(InfoCode::MaintenanceStart),
            20061 => Some(InfoCode::MaintenanceEnd),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_code_from_code() {
        assert_eq!(InfoCode::from_code(20000), Some(InfoCode::InvalidUser));
        assert_eq!(InfoCode::from_code(20051), Some(InfoCode::ServerRestart));
        assert_eq!(InfoCode::from_code(20060), Some(InfoCode::MaintenanceStart));
        assert_eq!(InfoCode::from_code(20061), Some(InfoCode::MaintenanceEnd));
        assert_eq!(InfoCode::from_code(10305), None);
    }
}
