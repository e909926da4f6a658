//! # protein-msa
//!
//! 结构预测流水线中的蛋白质 MSA 生成步骤。
//!
//! 读取单序列 FASTA 查询文件，经由外部序列搜索得到原始比对，再按以下条件过滤后写出 A3M：
//!
//! - **去冗余**：与查询（或已保留序列）一致性不低于 `min_identity` 的序列被移除
//! - **去片段**：对查询覆盖度低于 `min_coverage` 的序列被移除
//! - **序列数**：超过 `max_sequences` 时按输入顺序截断；少于 `min_sequences` 时标记为低多样性
//!
//! ## 快速示例
//!
//! ```rust
//! use protein_msa::io::a3m;
//! use protein_msa::msa::{self, FilterCriteria};
//!
//! let raw = a3m::parse(">q\nMKT-VRQ\n>h1\nMKTAVRQ\n".as_bytes()).unwrap();
//! let criteria = FilterCriteria { min_sequences: 1, ..FilterCriteria::default() };
//! let filtered = msa::filter(&raw, &criteria).unwrap();
//! assert_eq!(a3m::to_string(&filtered.alignment), ">q\nMKT-VRQ\n");
//! ```
//!
//! ## 模块说明
//!
//! - [`io`] — FASTA 查询读取、A3M 读写（原子替换）
//! - [`msa`] — 比对模型、一致性 / 覆盖度计算与过滤
//! - [`search`] — 外部序列搜索接口
//! - [`pipeline`] — 命令行流水线：输出目录、原始比对、过滤、运行报告
//! - [`util`] — 氨基酸 / 比对字符工具函数

pub mod error;
pub mod io;
pub mod msa;
pub mod pipeline;
pub mod search;
pub mod util;
