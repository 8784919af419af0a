use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, info};
use rayon::prelude::*;

use super::{Neighbor, TopKNeighbors, l2_sqr};
use crate::error::{Error, Result};

const MAGIC: &[u8; 6] = b"MSFLAT";
const VERSION: u16 = 1;
/// magic + version + dim + count
const HEADER_SIZE: u64 = 6 + 2 + 8 + 8;

/// 精确（暴力扫描）L2 向量索引
///
/// 文件格式（小端）：
/// - magic `MSFLAT`，u16 版本号
/// - u64 维度，u64 向量数量
/// - 所有 i64 ID
/// - 所有 f32 向量，按 ID 的顺序连续存放
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dim: usize,
    ids: Vec<i64>,
    data: Vec<f32>,
}

impl FlatIndex {
    /// 使用一批对齐的 ID 和向量创建索引
    pub fn from_batch(dim: usize, ids: &[i64], vectors: &[Vec<f32>]) -> Result<Self> {
        if dim == 0 {
            return Err(Error::IndexBuild("向量维度不能为 0".to_string()));
        }
        if ids.len() != vectors.len() {
            return Err(Error::IndexBuild(format!(
                "ID 数量 ({}) 与向量数量 ({}) 不一致",
                ids.len(),
                vectors.len()
            )));
        }

        let mut data = Vec::with_capacity(ids.len() * dim);
        for (id, vector) in ids.iter().zip(vectors) {
            if vector.len() != dim {
                return Err(Error::IndexBuild(format!(
                    "向量 {id} 的维度为 {}，应为 {dim}",
                    vector.len()
                )));
            }
            data.extend_from_slice(vector);
        }

        Ok(Self { dim, ids: ids.to_vec(), data })
    }

    /// 构建索引并替换磁盘上的索引文件
    ///
    /// 批次不合法时直接返回错误，原有的索引文件保持不变
    pub fn build(
        path: impl AsRef<Path>,
        dim: usize,
        ids: &[i64],
        vectors: &[Vec<f32>],
    ) -> Result<Self> {
        let index = Self::from_batch(dim, ids, vectors)?;
        index.save(path)?;
        Ok(index)
    }

    /// 从文件中加载索引
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("读取索引: {}", path.display());
        let index = Self::read_file(path)
            .map_err(|e| Error::ResourceLoad(format!("{}: {e}", path.display())))?;
        info!("已加载索引 {}，共 {} 条向量，维度 {}", path.display(), index.len(), index.dim);
        Ok(index)
    }

    /// 先写入临时文件，再通过 rename 原子替换
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let tmp_file = self.write_tmp(path)?;
        Self::commit(&tmp_file, path)
    }

    /// 将索引写入 `<path>.tmp`，返回临时文件路径
    ///
    /// 写入失败时临时文件会被删除，`path` 保持不变
    pub fn write_tmp(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp_file = tmp_path(path);
        if let Err(e) = self.write_file(&tmp_file) {
            let _ = fs::remove_file(&tmp_file);
            return Err(e.into());
        }
        debug!("已写入临时索引 {}，共 {} 条向量", tmp_file.display(), self.len());
        Ok(tmp_file)
    }

    /// 用 [`FlatIndex::write_tmp`] 写好的临时文件替换索引文件
    pub fn commit(tmp_file: impl AsRef<Path>, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::rename(tmp_file, path)?;
        info!("已写入索引 {}", path.display());
        Ok(())
    }

    /// 搜索最近的 k 个向量，按距离从近到远返回
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if k == 0 || self.is_empty() {
            return Ok(vec![]);
        }
        if query.len() != self.dim {
            return Err(Error::SearchBackend(format!(
                "查询向量维度为 {}，索引维度为 {}",
                query.len(),
                self.dim
            )));
        }

        let topk = self
            .data
            .par_chunks_exact(self.dim)
            .zip(self.ids.par_iter())
            .fold(
                || TopKNeighbors::new(k),
                |mut topk, (vector, &id)| {
                    topk.push(Neighbor { id, distance: l2_sqr(query, vector) });
                    topk
                },
            )
            .reduce(|| TopKNeighbors::new(k), TopKNeighbors::merge);

        Ok(topk.into_sorted_vec())
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    /// 按构建时的顺序遍历 `(ID, 向量)`
    pub fn entries(&self) -> impl Iterator<Item = (i64, &[f32])> {
        self.ids.iter().copied().zip(self.data.chunks_exact(self.dim))
    }

    fn write_file(&self, path: &Path) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);

        writer.write_all(MAGIC)?;
        writer.write_u16::<LittleEndian>(VERSION)?;
        writer.write_u64::<LittleEndian>(self.dim as u64)?;
        writer.write_u64::<LittleEndian>(self.ids.len() as u64)?;
        for &id in &self.ids {
            writer.write_i64::<LittleEndian>(id)?;
        }
        for &x in &self.data {
            writer.write_f32::<LittleEndian>(x)?;
        }

        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()
    }

    fn read_file(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 6];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(invalid_data("不是有效的索引文件"));
        }
        let version = reader.read_u16::<LittleEndian>()?;
        if version != VERSION {
            return Err(invalid_data(format!("不支持的索引版本: {version}")));
        }

        let dim = reader.read_u64::<LittleEndian>()?;
        let count = reader.read_u64::<LittleEndian>()?;
        if dim == 0 {
            return Err(invalid_data("索引维度为 0"));
        }

        // 先校验文件大小，避免损坏的头部导致过大的内存分配
        let expected = count
            .checked_mul(8)
            .zip(count.checked_mul(dim).and_then(|n| n.checked_mul(4)))
            .and_then(|(a, b)| a.checked_add(b))
            .and_then(|n| n.checked_add(HEADER_SIZE));
        if expected != Some(file_size) {
            return Err(invalid_data(format!(
                "文件大小 ({file_size}) 与头部描述不一致 (dim = {dim}, count = {count})"
            )));
        }

        let (dim, count) = (dim as usize, count as usize);
        let mut ids = vec![0i64; count];
        reader.read_i64_into::<LittleEndian>(&mut ids)?;
        let mut data = vec![0f32; count * dim];
        reader.read_f32_into::<LittleEndian>(&mut data)?;

        Ok(Self { dim, ids, data })
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn invalid_data(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}
