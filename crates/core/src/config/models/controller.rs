use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// 命令通道容量，满时提交方等待
    pub command_buffer: usize,
    /// 关闭时等待所有Worker退出的最长时间
    pub shutdown_timeout_seconds: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            command_buffer: 64,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.command_buffer == 0 {
            return Err(anyhow::anyhow!("命令通道容量必须大于0"));
        }

        if self.shutdown_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("关闭超时时间必须大于0"));
        }

        Ok(())
    }
}
