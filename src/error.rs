use thiserror::Error;

/// 单张图片 / 单个描述符处理过程中可能出现的错误
#[derive(Debug, Error)]
pub enum Error {
    #[error("无法解码图片")]
    DecodeFailure,
    #[error("未找到任何特征点")]
    NoKeypoints,
    #[error("描述符为空")]
    EmptyDescriptor,
    #[error("候选描述符数量过少: {0}")]
    InsufficientCandidateSize(usize),
    #[error("匹配结果应当包含 2 个近邻，实际为 {0}")]
    MatchShapeMismatch(usize),
    #[error("未找到任何匹配")]
    NoMatches,
    #[error("描述符维度不一致: {0} != {1}")]
    DimensionMismatch(usize, usize),
    #[error("worker 异常: {0}")]
    UnexpectedWorkerFailure(String),
    #[error(transparent)]
    OpenCv(#[from] opencv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    ReadNpy(#[from] ndarray_npy::ReadNpyError),
    #[error(transparent)]
    WriteNpy(#[from] ndarray_npy::WriteNpyError),
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    /// 是否属于算法层面的无效计算（图片本身不可用），而不是环境或程序错误
    pub fn is_invalid_computation(&self) -> bool {
        matches!(
            self,
            Self::DecodeFailure
                | Self::NoKeypoints
                | Self::EmptyDescriptor
                | Self::InsufficientCandidateSize(_)
                | Self::MatchShapeMismatch(_)
                | Self::NoMatches
                | Self::DimensionMismatch(..)
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
