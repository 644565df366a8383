//! Delegated process-management interface
//!
//! Process and task management is a separate subsystem; the file manager
//! only needs to hand "start this remote program" requests across this
//! boundary. The handler is detached on shutdown.

/// Sub-handler for remote process operations
pub trait ProcessHandler: Send + Sync {
    /// Launch a program on the agent at the given remote path
    fn start_process(&self, remote_path: &str);
}
