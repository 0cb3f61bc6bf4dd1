//! Manual sync requests. On Unix, `kill -USR1 <pid>` asks for an immediate cycle.

#[cfg(unix)]
mod imp {
    use tokio::signal::unix::{signal, Signal, SignalKind};

    pub struct ManualTrigger(Signal);

    impl ManualTrigger {
        pub fn install() -> std::io::Result<Self> {
            Ok(Self(signal(SignalKind::user_defined1())?))
        }

        /// Resolves once per received SIGUSR1. `None` means the listener closed.
        pub async fn requested(&mut self) -> Option<()> {
            self.0.recv().await
        }
    }
}

#[cfg(not(unix))]
mod imp {
    pub struct ManualTrigger;

    impl ManualTrigger {
        pub fn install() -> std::io::Result<Self> {
            Ok(Self)
        }

        pub async fn requested(&mut self) -> Option<()> {
            std::future::pending().await
        }
    }
}

pub use imp::ManualTrigger;
