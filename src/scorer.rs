// 该文件是 Dianming （点名） 项目的一部分。
// src/scorer.rs - 匹配判定与置信度
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::sync::Arc;

use tracing::debug;

use crate::{
  detector::{FaceRegion, FrameObservation},
  identity::{FeatureVector, Identity, IdentityCatalog},
};

pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.6;

/// 一个人脸的最佳匹配结果
#[derive(Debug, Clone, PartialEq)]
pub struct MatchDecision {
  /// 距离不超过阈值时为匹配到的身份，否则为 `None`（未知）
  pub identity: Option<Arc<Identity>>,
  pub distance: f64,
  pub confidence_pct: f64,
}

impl MatchDecision {
  fn unknown() -> Self {
    Self {
      identity: None,
      distance: f64::INFINITY,
      confidence_pct: 0.0,
    }
  }

  pub fn is_known(&self) -> bool {
    self.identity.is_some()
  }

  /// 界面上显示的名字
  pub fn label(&self) -> &str {
    self
      .identity
      .as_deref()
      .map(|i| i.display_name.as_str())
      .unwrap_or("Unknown")
  }

  /// 界面上显示的置信度文本，如 `90.92%`
  pub fn confidence_text(&self) -> String {
    format_confidence(self.confidence_pct)
  }
}

/// 带判定结果的人脸
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledFace {
  pub region: FaceRegion,
  pub decision: MatchDecision,
}

/// 一帧中所有人脸的判定结果，顺序与检测顺序一致
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoredObservation {
  pub faces: Box<[LabeledFace]>,
}

impl ScoredObservation {
  pub fn is_empty(&self) -> bool {
    self.faces.is_empty()
  }

  pub fn len(&self) -> usize {
    self.faces.len()
  }

  /// 只有第一个人脸参与考勤判定
  pub fn primary(&self) -> Option<&LabeledFace> {
    self.faces.first()
  }
}

#[derive(Debug, Clone, Copy)]
pub struct ConfidenceScorer {
  threshold: f64,
}

impl Default for ConfidenceScorer {
  fn default() -> Self {
    Self::new(DEFAULT_MATCH_THRESHOLD)
  }
}

impl ConfidenceScorer {
  /// `threshold` 取值须在 (0, 1) 之间，由配置校验保证
  pub fn new(threshold: f64) -> Self {
    Self { threshold }
  }

  pub fn threshold(&self) -> f64 {
    self.threshold
  }

  pub fn decide(&self, probe: &FeatureVector, catalog: &IdentityCatalog) -> MatchDecision {
    if catalog.is_empty() {
      return MatchDecision::unknown();
    }

    // 取第一个最小距离
    let (best_index, best_distance) = catalog
      .iter()
      .map(|identity| identity.feature_vector.distance(probe))
      .enumerate()
      .fold((0, f64::INFINITY), |(bi, bd), (i, d)| {
        if d < bd { (i, d) } else { (bi, bd) }
      });

    if best_distance.is_infinite() {
      return MatchDecision::unknown();
    }

    let identity = if best_distance <= self.threshold {
      catalog.get(best_index).cloned()
    } else {
      None
    };
    let confidence_pct = self.confidence(best_distance);
    debug!(
      "最佳匹配: {:?}, 距离: {:.4}, 置信度: {}",
      identity.as_deref().map(|i| i.id.as_str()),
      best_distance,
      format_confidence(confidence_pct)
    );

    MatchDecision {
      identity,
      distance: best_distance,
      confidence_pct,
    }
  }

  pub fn score(&self, observation: &FrameObservation, catalog: &IdentityCatalog) -> ScoredObservation {
    let faces = observation
      .faces
      .iter()
      .map(|face| LabeledFace {
        region: face.bbox,
        decision: self.decide(&face.encoding, catalog),
      })
      .collect();
    ScoredObservation { faces }
  }

  /// 距离转百分比置信度，保留两位小数
  pub fn confidence(&self, distance: f64) -> f64 {
    let range = 1.0 - self.threshold;
    let linear = (1.0 - distance) / (range * 2.0);

    if distance > self.threshold {
      round2(linear * 100.0)
    } else {
      let value = (linear + (1.0 - linear) * ((linear - 0.5) * 2.0).powf(0.2)) * 100.0;
      round2(value)
    }
  }
}

/// 按二进制精确值保留两位小数，中点取偶，与界面端的取整结果逐位一致
fn round2(value: f64) -> f64 {
  format!("{:.2}", value).parse().unwrap_or(value)
}

/// 按界面习惯格式化：整数值保留一位小数，如 `50.0%`
pub fn format_confidence(pct: f64) -> String {
  format!("{:?}%", pct)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::identity::Identity;

  fn catalog() -> IdentityCatalog {
    IdentityCatalog::new(vec![
      Identity::new("s001", "Alice", "CS", vec![0.0, 0.0]),
      Identity::new("s002", "Bob", "EE", vec![1.0, 0.0]),
    ])
    .unwrap()
  }

  #[test]
  fn confidence_uses_curve_at_and_below_threshold() {
    let scorer = ConfidenceScorer::default();
    assert_eq!(scorer.confidence(0.5), 90.92);
    assert_eq!(scorer.confidence(0.6), 50.0);
    assert_eq!(scorer.confidence(0.3), 99.3);
    assert_eq!(scorer.confidence(0.0), 97.89);
  }

  #[test]
  fn confidence_is_linear_above_threshold() {
    let scorer = ConfidenceScorer::default();
    assert_eq!(scorer.confidence(0.61), 48.75);
    assert_eq!(scorer.confidence(0.7), 37.5);
  }

  #[test]
  fn confidence_rounds_from_exact_value() {
    let scorer = ConfidenceScorer::default();
    // 刚超过阈值的距离不能显示为 50.0%
    assert_eq!(scorer.confidence(0.60004), 49.99);
    assert_eq!(scorer.confidence(0.60012), 49.98);
    assert_eq!(format_confidence(scorer.confidence(0.60004)), "49.99%");
    assert_eq!(scorer.confidence(0.65), 43.75);
    assert_eq!(scorer.confidence(1.0), 0.0);
  }

  #[test]
  fn round2_ties_go_to_even() {
    assert_eq!(round2(0.125), 0.12);
    assert_eq!(round2(0.375), 0.38);
    assert_eq!(round2(2.675), 2.67);
  }

  #[test]
  fn confidence_text_matches_display_format() {
    assert_eq!(format_confidence(50.0), "50.0%");
    assert_eq!(format_confidence(90.92), "90.92%");
  }

  #[test]
  fn picks_closest_identity_within_threshold() {
    let scorer = ConfidenceScorer::default();
    let decision = scorer.decide(&FeatureVector::new(vec![0.9, 0.0]), &catalog());
    assert_eq!(decision.label(), "Bob");
    assert!((decision.distance - 0.1).abs() < 1e-12);
  }

  #[test]
  fn distance_above_threshold_is_unknown() {
    let scorer = ConfidenceScorer::default();
    let decision = scorer.decide(&FeatureVector::new(vec![0.5, 0.7]), &catalog());
    assert!(!decision.is_known());
    assert_eq!(decision.label(), "Unknown");
    assert!(decision.distance > 0.6);
  }

  #[test]
  fn ties_resolve_to_first_identity() {
    let scorer = ConfidenceScorer::default();
    let decision = scorer.decide(&FeatureVector::new(vec![0.5, 0.0]), &catalog());
    assert_eq!(decision.label(), "Alice");
  }

  #[test]
  fn scores_every_face_in_order() {
    use crate::detector::FaceDetection;

    let scorer = ConfidenceScorer::default();
    let observation = FrameObservation::from(vec![
      FaceDetection {
        bbox: FaceRegion::new(0, 0, 10, 10),
        encoding: FeatureVector::new(vec![5.0, 5.0]),
      },
      FaceDetection {
        bbox: FaceRegion::new(20, 0, 30, 10),
        encoding: FeatureVector::new(vec![0.1, 0.0]),
      },
    ]);
    let scored = scorer.score(&observation, &catalog());
    assert_eq!(scored.len(), 2);
    assert_eq!(scored.primary().unwrap().decision.label(), "Unknown");
    assert_eq!(scored.faces[1].decision.label(), "Alice");
    assert_eq!(scored.faces[1].region, FaceRegion::new(20, 0, 30, 10));
  }

  #[test]
  fn empty_catalog_is_always_unknown() {
    let scorer = ConfidenceScorer::default();
    let decision = scorer.decide(&FeatureVector::new(vec![0.0, 0.0]), &IdentityCatalog::empty());
    assert!(!decision.is_known());
    assert!(decision.distance.is_infinite());
    assert_eq!(decision.confidence_pct, 0.0);
  }
}
