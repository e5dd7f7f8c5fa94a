//! Merge Index Module
//!
//! 結合セル範囲を座標インデックスに展開し、任意のセル座標から
//! 論理値の所在（自分自身・アンカー・抑制・曖昧）を定数時間で引けるようにする。
//!
//! インデックスはシートごとに一度だけ構築し、セグメント分割中は読み取り専用で共有します。

use std::collections::HashMap;

use crate::types::{CellCoord, CellRange, MergedRegion};

/// 座標ごとの結合情報
#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    /// 結合範囲のアンカー（左上セル）
    Anchor,
    /// アンカー以外の結合範囲メンバー
    Member,
    /// 複数の結合範囲に含まれる（リージョンのインデックス）
    Conflict(Vec<usize>),
}

/// 座標の解決結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Resolution {
    /// 結合範囲に含まれない: セル自身の値を使う
    Own,
    /// 結合範囲のアンカー: セル自身（= アンカー）の値を使う
    Anchor,
    /// アンカー以外のメンバー: 値なし
    Suppressed,
    /// 複数の結合範囲が重なっている
    Ambiguous(Vec<CellRange>),
}

/// 座標 -> 結合情報のインデックス
#[derive(Debug, Clone, Default)]
pub(crate) struct MergeIndex {
    regions: Vec<MergedRegion>,
    slots: HashMap<CellCoord, Slot>,
}

impl MergeIndex {
    /// 結合範囲のリストからインデックスを構築
    ///
    /// 範囲は指定された行・列の交点だけに展開されます。値を持たない行は解決されないため、
    /// 列全体・行全体の結合でもインデックスの大きさは実際に参照される座標数で抑えられます。
    ///
    /// # 引数
    ///
    /// * `regions` - シートの結合範囲
    /// * `rows` - 解決対象の行（昇順）
    /// * `cols` - 解決対象の列（昇順）
    pub fn build(regions: Vec<MergedRegion>, rows: &[u32], cols: &[u32]) -> Self {
        let mut slots: HashMap<CellCoord, Slot> = HashMap::new();

        for (idx, region) in regions.iter().enumerate() {
            let range = region.range;
            if range.start.row > range.end.row || range.start.col > range.end.col {
                continue;
            }

            for &row in within(rows, range.start.row, range.end.row) {
                for &col in within(cols, range.start.col, range.end.col) {
                    let coord = CellCoord::new(row, col);
                    let slot = if coord == region.anchor {
                        Slot::Anchor
                    } else {
                        Slot::Member
                    };

                    slots
                        .entry(coord)
                        .and_modify(|existing| {
                            let mut owners = match existing {
                                Slot::Conflict(owners) => std::mem::take(owners),
                                _ => Self::owners_of(&regions[..idx], coord),
                            };
                            owners.push(idx);
                            *existing = Slot::Conflict(owners);
                        })
                        .or_insert(slot);
                }
            }
        }

        Self { regions, slots }
    }

    /// 先行するリージョンのうち、座標を含むもののインデックス
    fn owners_of(regions: &[MergedRegion], coord: CellCoord) -> Vec<usize> {
        regions
            .iter()
            .enumerate()
            .filter(|(_, r)| r.contains(coord))
            .map(|(i, _)| i)
            .collect()
    }

    /// 座標を解決する
    pub fn resolve(&self, coord: CellCoord) -> Resolution {
        match self.slots.get(&coord) {
            None => Resolution::Own,
            Some(Slot::Anchor) => Resolution::Anchor,
            Some(Slot::Member) => Resolution::Suppressed,
            Some(Slot::Conflict(owners)) => Resolution::Ambiguous(
                owners.iter().map(|&i| self.regions[i].range).collect(),
            ),
        }
    }

    /// 結合範囲のリスト
    pub fn regions(&self) -> &[MergedRegion] {
        &self.regions
    }

    /// インデックスを破棄し、結合範囲のリストを返す
    pub fn into_regions(self) -> Vec<MergedRegion> {
        self.regions
    }
}

/// 昇順スライスのうち `[first, last]` に入る部分
fn within(sorted: &[u32], first: u32, last: u32) -> &[u32] {
    let lo = sorted.partition_point(|&v| v < first);
    let hi = sorted.partition_point(|&v| v <= last);
    &sorted[lo..hi.max(lo)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(r1: u32, c1: u32, r2: u32, c2: u32) -> MergedRegion {
        MergedRegion::new(CellRange::new(CellCoord::new(r1, c1), CellCoord::new(r2, c2)))
    }

    /// 密な `rows` x `cols` のグリッドに対するインデックス
    fn dense(regions: Vec<MergedRegion>, rows: u32, cols: u32) -> MergeIndex {
        let rows: Vec<u32> = (0..rows).collect();
        let cols: Vec<u32> = (0..cols).collect();
        MergeIndex::build(regions, &rows, &cols)
    }

    #[test]
    fn test_resolve_unmerged_cell() {
        let index = dense(vec![region(0, 0, 0, 2)], 10, 10);
        assert_eq!(index.resolve(CellCoord::new(1, 0)), Resolution::Own);
    }

    #[test]
    fn test_resolve_anchor_and_members() {
        let index = dense(vec![region(1, 1, 2, 3)], 10, 10);
        assert_eq!(index.resolve(CellCoord::new(1, 1)), Resolution::Anchor);
        assert_eq!(index.resolve(CellCoord::new(1, 2)), Resolution::Suppressed);
        assert_eq!(index.resolve(CellCoord::new(2, 3)), Resolution::Suppressed);
        assert_eq!(index.resolve(CellCoord::new(3, 3)), Resolution::Own);
    }

    #[test]
    fn test_resolve_overlapping_regions() {
        let a = region(0, 0, 1, 1);
        let b = region(0, 1, 0, 2);
        let index = dense(vec![a.clone(), b.clone()], 10, 10);

        match index.resolve(CellCoord::new(0, 1)) {
            Resolution::Ambiguous(ranges) => {
                assert_eq!(ranges, vec![a.range, b.range]);
            }
            other => panic!("Expected Ambiguous, got {:?}", other),
        }
        // 重なっていない部分は通常どおり解決される
        assert_eq!(index.resolve(CellCoord::new(0, 0)), Resolution::Anchor);
        assert_eq!(index.resolve(CellCoord::new(0, 2)), Resolution::Suppressed);
    }

    #[test]
    fn test_three_way_overlap_lists_every_region() {
        let index = dense(
            vec![region(0, 0, 0, 3), region(0, 2, 1, 2), region(0, 2, 0, 2)],
            5,
            5,
        );
        match index.resolve(CellCoord::new(0, 2)) {
            Resolution::Ambiguous(ranges) => assert_eq!(ranges.len(), 3),
            other => panic!("Expected Ambiguous, got {:?}", other),
        }
    }

    #[test]
    fn test_full_column_merge_is_clipped_to_grid() {
        let index = dense(vec![region(0, 0, 1_048_575, 0)], 3, 2);
        assert_eq!(index.slots.len(), 3);
        assert_eq!(index.resolve(CellCoord::new(2, 0)), Resolution::Suppressed);
    }

    #[test]
    fn test_sparse_rows_limit_expansion() {
        let index = MergeIndex::build(
            vec![region(0, 0, 1_048_575, 16_383)],
            &[0, 500_000, 1_048_575],
            &[0, 16_383],
        );
        assert_eq!(index.slots.len(), 6);
        assert_eq!(index.resolve(CellCoord::new(0, 0)), Resolution::Anchor);
        assert_eq!(index.resolve(CellCoord::new(500_000, 16_383)), Resolution::Suppressed);
        // 対象外の座標は展開されない
        assert_eq!(index.resolve(CellCoord::new(1, 1)), Resolution::Own);
    }

    #[test]
    fn test_inverted_region_is_ignored() {
        let index = dense(vec![region(3, 3, 1, 1)], 5, 5);
        assert_eq!(index.resolve(CellCoord::new(2, 2)), Resolution::Own);
    }
}
