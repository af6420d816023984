use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use syncer_errors::SyncerError;

/// 生命周期操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandAction {
    Start,
    Stop,
    Restart,
}

impl CommandAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandAction::Start => "start",
            CommandAction::Stop => "stop",
            CommandAction::Restart => "restart",
        }
    }
}

impl FromStr for CommandAction {
    type Err = SyncerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(CommandAction::Start),
            "stop" => Ok(CommandAction::Stop),
            "restart" => Ok(CommandAction::Restart),
            _ => Err(SyncerError::validation_error("Invalid action")),
        }
    }
}

impl fmt::Display for CommandAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 针对单个任务的生命周期命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub task_id: i64,
    pub action: CommandAction,
}

impl Command {
    pub fn new(task_id: i64, action: CommandAction) -> Self {
        Self { task_id, action }
    }
    pub fn start(task_id: i64) -> Self {
        Self::new(task_id, CommandAction::Start)
    }
    pub fn stop(task_id: i64) -> Self {
        Self::new(task_id, CommandAction::Stop)
    }
    pub fn restart(task_id: i64) -> Self {
        Self::new(task_id, CommandAction::Restart)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.action, self.task_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_action() {
        assert_eq!("start".parse::<CommandAction>().unwrap(), CommandAction::Start);
        assert_eq!("restart".parse::<CommandAction>().unwrap(), CommandAction::Restart);
        let err = "pause".parse::<CommandAction>().unwrap_err();
        assert_eq!(err.to_string(), "数据验证失败: Invalid action");
    }

    #[test]
    fn test_command_display() {
        assert_eq!(Command::stop(7).to_string(), "stop(7)");
    }
}
