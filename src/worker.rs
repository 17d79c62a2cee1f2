//! 按工作目录串行执行的后台任务。
//!
//! 同一工作目录同时只允许一个任务，第二个任务会立即失败而不是排队。

use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use dashmap::{DashMap, mapref::entry::Entry};
use tracing::{debug, warn};

use crate::error::{KaraokeError, Result};

static ACTIVE_WORKDIRS: LazyLock<DashMap<PathBuf, ()>> = LazyLock::new(DashMap::new);

/// 任务结束（包括 panic）时释放工作目录。
struct WorkdirGuard {
    key: PathBuf,
}

impl Drop for WorkdirGuard {
    fn drop(&mut self) {
        ACTIVE_WORKDIRS.remove(&self.key);
        debug!("已释放工作目录 {:?}", self.key);
    }
}

fn workdir_key(working_dir: &Path) -> PathBuf {
    working_dir
        .canonicalize()
        .unwrap_or_else(|_| working_dir.to_path_buf())
}

/// 工作目录上是否有任务在运行。
#[must_use]
pub fn is_busy(working_dir: &Path) -> bool {
    ACTIVE_WORKDIRS.contains_key(&workdir_key(working_dir))
}

/// 在阻塞线程池中执行任务，执行期间占用该工作目录。
///
/// # 错误
/// 工作目录上已有任务在运行时返回 `WorkdirBusy`。
pub async fn run_exclusive<F, T>(working_dir: &Path, job: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let key = workdir_key(working_dir);
    match ACTIVE_WORKDIRS.entry(key.clone()) {
        Entry::Occupied(_) => {
            warn!("工作目录 {:?} 上已有任务在运行", key);
            return Err(KaraokeError::WorkdirBusy(key));
        }
        Entry::Vacant(entry) => {
            entry.insert(());
        }
    }

    let guard = WorkdirGuard { key };
    tokio::task::spawn_blocking(move || {
        let _guard = guard;
        job()
    })
    .await
    .map_err(|e| KaraokeError::Internal(format!("后台任务异常结束: {e}")))?
}
