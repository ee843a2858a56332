//! 描述符数据库
//!
//! 数据库是一个与图片目录结构一一对应的目录树，每张图片对应一个 `.npy` 文件，
//! 例如 `<图片根目录>/a/b.jpg` 的描述符保存在 `<数据库根目录>/a/b.jpg.npy`。

use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use ndarray_npy::{read_npy, write_npy};

use crate::descriptor::{DescriptorRecord, DescriptorSet};
use crate::error::Result;
use crate::utils;

/// 描述符文件后缀
pub const DESCRIPTOR_SUFFIX: &str = "npy";

pub struct DescriptorStore {
    root: PathBuf,
}

impl DescriptorStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 返回记录对应的描述符文件路径，总是追加 `.npy`，不同的记录不会落到同一个文件
    pub fn record_path(&self, name: &Path) -> PathBuf {
        append_suffix(self.root.join(name))
    }

    /// 由描述符文件路径反推记录名称，只去掉一层 `.npy`，
    /// 不在数据库目录下的路径返回 None
    pub fn record_name(&self, path: &Path) -> Option<PathBuf> {
        let rel = path.strip_prefix(&self.root).ok()?;
        if rel.extension() == Some(OsStr::new(DESCRIPTOR_SUFFIX)) {
            Some(rel.with_extension(""))
        } else {
            Some(rel.to_path_buf())
        }
    }

    /// 保存一条记录，按需创建父目录，已存在的记录会被整体替换
    pub fn save(&self, record: &DescriptorRecord) -> Result<PathBuf> {
        let path = self.record_path(&record.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        save_descriptors(&path, &record.descriptors)?;
        Ok(path)
    }

    pub fn load(&self, name: &Path) -> Result<DescriptorSet> {
        load_descriptors(&self.record_path(name))
    }

    /// 列出数据库中的所有条目，包括目录，由调用方过滤
    pub fn list_paths(&self) -> Vec<PathBuf> {
        utils::scan_tree(&self.root)
    }
}

/// 在路径末尾追加 `.npy`，已有该后缀时保持不变
pub fn with_suffix(path: PathBuf) -> PathBuf {
    if path.extension() == Some(OsStr::new(DESCRIPTOR_SUFFIX)) {
        return path;
    }
    append_suffix(path)
}

fn append_suffix(path: PathBuf) -> PathBuf {
    let mut s = OsString::from(path);
    s.push(".");
    s.push(DESCRIPTOR_SUFFIX);
    PathBuf::from(s)
}

/// 读取描述符文件，npy 格式本身不包含可执行对象
pub fn load_descriptors(path: &Path) -> Result<DescriptorSet> {
    let data: Array2<f32> = read_npy(path)?;
    Ok(DescriptorSet::new(data))
}

/// 先写入临时文件再重命名，避免中断时留下不完整的文件
pub fn save_descriptors(path: &Path, descriptors: &DescriptorSet) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    write_npy(&tmp, &descriptors.view())?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn save_and_load() {
        let dir = tempdir().unwrap();
        let store = DescriptorStore::new(dir.path());
        let record = DescriptorRecord::new(
            "cats/tom.jpg",
            DescriptorSet::new(array![[0.5f32, 1.25, -3.0], [7.0, 0.0, 1e-7]]),
        );

        let path = store.save(&record).unwrap();
        assert_eq!(path, dir.path().join("cats/tom.jpg.npy"));
        assert_eq!(store.load(Path::new("cats/tom.jpg")).unwrap(), record.descriptors);
        assert_eq!(store.record_name(&path), Some(PathBuf::from("cats/tom.jpg")));
    }

    #[test]
    fn roundtrip_is_byte_identical() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("first.npy");
        let second = dir.path().join("second.npy");
        for descriptors in [
            DescriptorSet::empty(128),
            DescriptorSet::new(Array2::from_shape_fn((17, 128), |(i, j)| (i * 131 + j) as f32 / 7.)),
        ] {
            save_descriptors(&first, &descriptors).unwrap();
            let loaded = load_descriptors(&first).unwrap();
            assert_eq!(loaded, descriptors);
            save_descriptors(&second, &loaded).unwrap();
            assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
        }
    }

    #[test]
    fn save_replaces_existing_record() {
        let dir = tempdir().unwrap();
        let store = DescriptorStore::new(dir.path());
        store.save(&DescriptorRecord::new("a.png", DescriptorSet::new(array![[1.0f32, 2.0]]))).unwrap();
        let newer = DescriptorSet::new(array![[3.0f32, 4.0], [5.0, 6.0]]);
        store.save(&DescriptorRecord::new("a.png", newer.clone())).unwrap();

        assert_eq!(store.load(Path::new("a.png")).unwrap(), newer);
        assert!(!dir.path().join("a.png.npy.tmp").exists());
    }

    #[test]
    fn suffix_is_appended_once() {
        assert_eq!(with_suffix(PathBuf::from("q")), PathBuf::from("q.npy"));
        assert_eq!(with_suffix(PathBuf::from("q.jpg")), PathBuf::from("q.jpg.npy"));
        assert_eq!(with_suffix(PathBuf::from("q.npy")), PathBuf::from("q.npy"));
    }

    #[test]
    fn npy_named_images_get_their_own_record() {
        let dir = tempdir().unwrap();
        let store = DescriptorStore::new(dir.path());
        let plain = store.save(&DescriptorRecord::new("foo", DescriptorSet::new(array![[1.0f32]]))).unwrap();
        let npy = store.save(&DescriptorRecord::new("foo.npy", DescriptorSet::new(array![[2.0f32]]))).unwrap();

        assert_eq!(plain, dir.path().join("foo.npy"));
        assert_eq!(npy, dir.path().join("foo.npy.npy"));
        assert_eq!(store.record_name(&plain), Some(PathBuf::from("foo")));
        assert_eq!(store.record_name(&npy), Some(PathBuf::from("foo.npy")));
        assert_eq!(store.load(Path::new("foo")).unwrap(), DescriptorSet::new(array![[1.0f32]]));
        assert_eq!(store.load(Path::new("foo.npy")).unwrap(), DescriptorSet::new(array![[2.0f32]]));
    }

    #[test]
    fn list_paths_mirrors_tree() {
        let dir = tempdir().unwrap();
        let store = DescriptorStore::new(dir.path());
        store.save(&DescriptorRecord::new("x/1.jpg", DescriptorSet::empty(4))).unwrap();
        store.save(&DescriptorRecord::new("2.jpg", DescriptorSet::empty(4))).unwrap();

        let names = store
            .list_paths()
            .iter()
            .filter(|p| p.is_file())
            .filter_map(|p| store.record_name(p))
            .collect::<Vec<_>>();
        assert_eq!(names, vec![PathBuf::from("2.jpg"), PathBuf::from("x/1.jpg")]);
    }

    #[test]
    fn load_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.npy");
        fs::write(&path, b"\x93NUMPY garbage").unwrap();
        assert!(load_descriptors(&path).is_err());
    }
}
