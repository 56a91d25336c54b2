use anyhow::Result;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    /// 服务器绑定地址
    pub bind_addr: String,

    /// ONNX模型文件路径
    pub model_path: PathBuf,

    /// 上传临时文件目录
    pub upload_dir: PathBuf,

    /// 工作线程数量
    pub workers: usize,

    /// 开发模式
    pub dev_mode: bool,

    /// ONNX Runtime配置
    pub onnx_config: OnnxConfig,

    /// 服务器配置
    pub server_config: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct OnnxConfig {
    /// CPU线程数
    pub intra_threads: usize,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// 请求超时时间（秒）
    pub request_timeout: u64,

    /// 最大请求体大小（字节）
    pub max_request_size: usize,
}

impl Config {
    pub fn new(
        bind_addr: String,
        model_path: String,
        upload_dir: String,
        workers: Option<usize>,
        dev_mode: bool,
    ) -> Result<Self> {
        let cpu_cores = num_cpus::get();
        let workers = workers.unwrap_or(cpu_cores);
        if workers == 0 {
            anyhow::bail!("worker count must be at least 1");
        }

        let onnx_config = OnnxConfig {
            intra_threads: (cpu_cores * 3 / 4).max(1), // 使用75%的CPU核心
        };

        let server_config = ServerConfig {
            request_timeout: if dev_mode { 300 } else { 60 },
            max_request_size: 10 * 1024 * 1024, // 10MB
        };

        Ok(Self {
            bind_addr,
            model_path: PathBuf::from(model_path),
            upload_dir: PathBuf::from(upload_dir),
            workers,
            dev_mode,
            onnx_config,
            server_config,
        })
    }

    /// 未设置 RUST_LOG 时使用的日志级别，开发模式固定为 debug
    pub fn log_filter<'a>(&self, requested: &'a str) -> &'a str {
        if self.dev_mode {
            "debug"
        } else {
            requested
        }
    }
}
