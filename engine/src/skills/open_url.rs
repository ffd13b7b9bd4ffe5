//! URL Opener Skill
//!
//! Opens a URL in the system default browser. The spawn helper is shared
//! with the web-search skill's site-routing path.

use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::skill::{Skill, SkillOutput, SkillParams};
use tracing::info;

/// Open a URL in the default browser, detached
pub(crate) fn spawn_browser(url: &str) -> Result<(), EngineError> {
    #[cfg(target_os = "macos")]
    let mut command = {
        let mut c = tokio::process::Command::new("open");
        c.arg(url);
        c
    };
    #[cfg(target_os = "windows")]
    let mut command = {
        let mut c = tokio::process::Command::new("cmd");
        c.args(["/C", "start", "", url]);
        c
    };
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let mut command = {
        let mut c = tokio::process::Command::new("xdg-open");
        c.arg(url);
        c
    };

    command
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map(|_| ())
        .map_err(|e| EngineError::Skill(format!("Could not open URL: {}", e)))
}

pub struct OpenUrlSkill;

#[async_trait]
impl Skill for OpenUrlSkill {
    fn name(&self) -> &str {
        "open_url"
    }

    fn description(&self) -> &str {
        "Opens a URL in the default browser"
    }

    async fn run(&self, params: &SkillParams) -> Result<SkillOutput, EngineError> {
        let url = params.str("url")?;
        info!("Opening URL: {}", url);
        spawn_browser(url)?;
        Ok(SkillOutput::UrlOpened {
            message: format!("Opened {} in browser", url),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_url_is_an_error() {
        let skill = OpenUrlSkill;
        let result = skill.run(&SkillParams::new()).await;
        assert!(matches!(result, Err(EngineError::MissingParameter(_))));
    }
}
