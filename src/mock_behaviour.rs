//! This module provides ways to tweak the mocked server, so that it can return errors on some tests
#![cfg(any(test, feature = "mock_remote_server"))]

use crate::error::SourceError;

/// This stores some behaviour tweaks, that describe how a mocked server will behave during a given test
///
/// So that a function fails _n_ times after _m_ initial successes, set `(m, n)` for the suited parameter
#[derive(Default, Clone, Debug)]
pub struct MockBehaviour {
    /// If this is true, every action will be allowed
    pub is_suspended: bool,

    pub sign_up_behaviour: (u32, u32),
    pub log_in_behaviour: (u32, u32),
    pub log_out_behaviour: (u32, u32),
    pub fetch_day_behaviour: (u32, u32),
    pub save_day_behaviour: (u32, u32),
}

impl MockBehaviour {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every operation will fail at once, for `n_fails` times
    pub fn fail_now(n_fails: u32) -> Self {
        Self {
            is_suspended: false,
            sign_up_behaviour: (0, n_fails),
            log_in_behaviour: (0, n_fails),
            log_out_behaviour: (0, n_fails),
            fetch_day_behaviour: (0, n_fails),
            save_day_behaviour: (0, n_fails),
        }
    }

    /// Suspend this mock behaviour until you call `resume`
    pub fn suspend(&mut self) {
        self.is_suspended = true;
    }
    /// Make this behaviour active again
    pub fn resume(&mut self) {
        self.is_suspended = false;
    }

    pub fn can_sign_up(&mut self) -> Result<(), SourceError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.sign_up_behaviour, "sign_up")
    }
    pub fn can_log_in(&mut self) -> Result<(), SourceError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.log_in_behaviour, "log_in")
    }
    pub fn can_log_out(&mut self) -> Result<(), SourceError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.log_out_behaviour, "log_out")
    }
    pub fn can_fetch_day(&mut self) -> Result<(), SourceError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.fetch_day_behaviour, "fetch_day")
    }
    pub fn can_save_day(&mut self) -> Result<(), SourceError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.save_day_behaviour, "save_day")
    }
}

/// Return Ok(()) in case the value is `(1+, _)` or `(_, 0)`, or return Err and decrement otherwise
fn decrement(value: &mut (u32, u32), descr: &str) -> Result<(), SourceError> {
    let remaining_successes = value.0;
    let remaining_failures = value.1;

    if remaining_successes > 0 {
        value.0 = value.0 - 1;
        log::debug!("Mock behaviour: allowing a {} ({:?})", descr, value);
        Ok(())
    } else {
        if remaining_failures > 0 {
            value.1 = value.1 - 1;
            log::debug!("Mock behaviour: failing a {} ({:?})", descr, value);
            Err(SourceError::Transport(format!(
                "Mocked behaviour requires this {} to fail this time. ({:?})",
                descr, value
            )))
        } else {
            log::debug!("Mock behaviour: allowing a {} ({:?})", descr, value);
            Ok(())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mock_behaviour() {
        let mut ok = MockBehaviour::new();
        assert!(ok.can_fetch_day().is_ok());
        assert!(ok.can_fetch_day().is_ok());
        assert!(ok.can_fetch_day().is_ok());
        assert!(ok.can_save_day().is_ok());

        let mut now = MockBehaviour::fail_now(2);
        assert!(now.can_fetch_day().is_err());
        assert!(now.can_save_day().is_err());
        assert!(now.can_save_day().is_err());
        assert!(now.can_fetch_day().is_err());
        assert!(now.can_fetch_day().is_ok());
        assert!(now.can_fetch_day().is_ok());
        assert!(now.can_save_day().is_ok());

        let mut custom = MockBehaviour {
            fetch_day_behaviour: (0, 1),
            save_day_behaviour: (1, 3),
            ..MockBehaviour::default()
        };
        assert!(custom.can_fetch_day().is_err());
        assert!(custom.can_fetch_day().is_ok());
        assert!(custom.can_fetch_day().is_ok());
        assert!(custom.can_save_day().is_ok());
        assert!(custom.can_save_day().is_err());
        assert!(custom.can_save_day().is_err());
        assert!(custom.can_save_day().is_err());
        assert!(custom.can_save_day().is_ok());
        assert!(custom.can_save_day().is_ok());
    }
}
