//! Best-effort desktop notifications for pipeline outcomes.
//!
//! Linux goes through the freedesktop Notifications D-Bus interface;
//! other platforms fall back to the log. Failures are logged and
//! swallowed; a missed notification must never fail an upload.

use async_trait::async_trait;

use crate::capture::Notifier;

pub const APP_NAME: &str = "picshot";

/// Production notifier.
pub struct DesktopNotifier;

#[async_trait]
impl Notifier for DesktopNotifier {
    async fn notify(&self, summary: &str, body: &str) {
        if let Err(err) = send_notification(summary, body).await {
            log::warn!("Failed to send notification: {err}");
            log::info!("{summary}: {body}");
        }
    }
}

#[cfg(target_os = "linux")]
mod dbus {
    use std::collections::HashMap;

    use zbus::{Connection, proxy};

    /// D-Bus interface for freedesktop Notifications.
    #[proxy(
        interface = "org.freedesktop.Notifications",
        default_service = "org.freedesktop.Notifications",
        default_path = "/org/freedesktop/Notifications"
    )]
    trait Notifications {
        #[allow(clippy::too_many_arguments)]
        fn notify(
            &self,
            app_name: &str,
            replaces_id: u32,
            app_icon: &str,
            summary: &str,
            body: &str,
            actions: Vec<&str>,
            hints: HashMap<&str, zbus::zvariant::Value<'_>>,
            expire_timeout: i32,
        ) -> zbus::Result<u32>;
    }

    pub(super) async fn send(summary: &str, body: &str) -> Result<(), String> {
        let connection = Connection::session()
            .await
            .map_err(|e| format!("failed to connect to session bus: {e}"))?;

        let proxy = NotificationsProxy::new(&connection)
            .await
            .map_err(|e| format!("failed to create notifications proxy: {e}"))?;

        proxy
            .notify(
                super::APP_NAME,
                0,
                "camera-photo",
                summary,
                body,
                vec![],
                HashMap::new(),
                5000, // 5 second timeout
            )
            .await
            .map_err(|e| format!("failed to send notification: {e}"))?;

        Ok(())
    }
}

/// Send a system notification.
#[cfg(target_os = "linux")]
pub async fn send_notification(summary: &str, body: &str) -> Result<(), String> {
    // The session bus of an elevated process is not the desktop user's;
    // route through notify-send under the invoking user instead.
    if let Some(user) = crate::elevation::invoking_user() {
        return send_as_user(&user, summary, body);
    }
    dbus::send(summary, body).await
}

#[cfg(not(target_os = "linux"))]
pub async fn send_notification(summary: &str, body: &str) -> Result<(), String> {
    log::info!("{summary}: {body}");
    Ok(())
}

#[cfg(target_os = "linux")]
fn send_as_user(user: &str, summary: &str, body: &str) -> Result<(), String> {
    use std::process::Command;

    let (display, xauthority) = crate::elevation::session_env(user);
    let cmd = format!("DISPLAY={display} XAUTHORITY={xauthority} notify-send '{summary}' '{body}'");
    let status = Command::new("su")
        .arg(user)
        .arg("-c")
        .arg(&cmd)
        .status()
        .map_err(|e| format!("failed to run su: {e}"))?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("notify-send exited with {status}"))
    }
}
