//! Weighted single and multi-choice sampler.
//!
//! The sampler holds no random state: every draw takes the caller's RNG, so
//! determinism is entirely a property of how the caller seeds it.

use crate::models::{Answer, Choices, Mode, PickPolicy, Question, SamplerError};
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use std::collections::HashMap;
use tracing::trace;

/// Draws answers from validated questions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeightedSampler {
    policy: PickPolicy,
}

impl WeightedSampler {
    pub fn new(policy: PickPolicy) -> Self {
        Self { policy }
    }

    /// Draw one label with probability proportional to its weight.
    pub fn draw_single<R: Rng>(&self, question: &Question, rng: &mut R) -> Result<String, SamplerError> {
        if question.mode() != Mode::Single {
            return Err(SamplerError::ModeMismatch {
                question: question.id().to_string(),
                expected: "single",
            });
        }
        draw_one(question.id(), question.choices(), rng)
    }

    /// Draw between 1 and `max_picks` distinct labels without replacement.
    ///
    /// The pick count follows the sampler's `PickPolicy` and is capped at the
    /// number of positive-weight options. The cap is not an error.
    pub fn draw_multi<R: Rng>(&self, question: &Question, rng: &mut R) -> Result<Vec<String>, SamplerError> {
        let Mode::Multi { max_picks } = question.mode() else {
            return Err(SamplerError::ModeMismatch {
                question: question.id().to_string(),
                expected: "multi",
            });
        };
        let picks = self.pick_count(max_picks, rng);
        draw_distinct(question.id(), question.choices(), picks, rng)
    }

    /// Draw using the first conditional rule matching `context`, or the base
    /// distribution when none matches.
    pub fn draw_conditional<R: Rng>(
        &self,
        question: &Question,
        context: &HashMap<String, Answer>,
        rng: &mut R,
    ) -> Result<Answer, SamplerError> {
        let Some(rule) = question.rule_for(context) else {
            return match question.mode() {
                Mode::Single => self.draw_single(question, rng).map(Answer::Single),
                Mode::Multi { .. } => self.draw_multi(question, rng).map(Answer::Multi),
            };
        };

        trace!(
            question = question.id(),
            when = rule.when(),
            equals = rule.equals(),
            "Conditional override"
        );

        match question.mode() {
            Mode::Single => draw_one(question.id(), rule.choices(), rng).map(Answer::Single),
            Mode::Multi { max_picks } => {
                let picks = self.pick_count(max_picks, rng);
                draw_distinct(question.id(), rule.choices(), picks, rng).map(Answer::Multi)
            }
        }
    }

    /// Number of picks for a multi question under this sampler's policy.
    pub fn pick_count<R: Rng>(&self, max_picks: usize, rng: &mut R) -> usize {
        match self.policy {
            PickPolicy::Fixed => max_picks,
            PickPolicy::Uniform => rng.random_range(1..=max_picks.max(1)),
        }
    }
}

fn weighted_index(question: &str, weights: &[f64]) -> Result<WeightedIndex<f64>, SamplerError> {
    WeightedIndex::new(weights.iter().copied()).map_err(|e| SamplerError::invalid(question, e.to_string()))
}

fn draw_one<R: Rng>(question: &str, choices: &Choices, rng: &mut R) -> Result<String, SamplerError> {
    let index = weighted_index(question, choices.probabilities())?;
    Ok(choices.options()[index.sample(rng)].clone())
}

/// Successive weighted draws, each from the options not yet taken.
///
/// The index is rebuilt every round from the remaining probabilities, so its
/// total is a fresh sum rather than a running difference that can round to
/// zero while positive options remain.
fn draw_distinct<R: Rng>(
    question: &str,
    choices: &Choices,
    picks: usize,
    rng: &mut R,
) -> Result<Vec<String>, SamplerError> {
    let rounds = picks.clamp(1, choices.positive_count());
    let mut remaining = choices.probabilities().to_vec();
    let mut drawn = Vec::with_capacity(rounds);

    for _ in 0..rounds {
        let i = weighted_index(question, &remaining)?.sample(rng);
        drawn.push(choices.options()[i].clone());
        remaining[i] = 0.0;
    }

    Ok(drawn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConditionalRule;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    const DRAWS: usize = 100_000;

    fn role() -> Question {
        Question::single("身份", &["母亲", "父亲", "祖父母", "其他亲属"], &[68.0, 25.0, 5.0, 2.0]).unwrap()
    }

    fn abilities(max_picks: usize) -> Question {
        Question::multi(
            "能力培养",
            &["创造力", "规则意识", "情绪管理", "知识学习", "运动能力", "艺术兴趣", "其他"],
            &[52.0, 48.0, 45.0, 35.0, 28.0, 15.0, 4.0],
            max_picks,
        )
        .unwrap()
    }

    const AGES: [&str; 5] = ["25岁及以下", "26-30岁", "31-35岁", "36-40岁", "41岁及以上"];

    fn age() -> Question {
        let mother = Choices::new(
            "年龄",
            AGES.iter().map(|s| s.to_string()).collect(),
            &[0.02, 0.12, 0.45, 0.35, 0.06],
        )
        .unwrap();
        Question::single("年龄", &AGES, &[3.0, 7.0, 40.0, 30.0, 20.0])
            .unwrap()
            .with_rule(ConditionalRule::new("role", "母亲", mother))
    }

    fn frequencies(labels: &[String], draws: impl Iterator<Item = String>) -> Vec<f64> {
        let mut counts = vec![0usize; labels.len()];
        let mut total = 0usize;
        for label in draws {
            let i = labels.iter().position(|l| *l == label).unwrap();
            counts[i] += 1;
            total += 1;
        }
        counts.iter().map(|c| *c as f64 / total as f64).collect()
    }

    fn assert_close(observed: &[f64], expected: &[f64]) {
        for (o, e) in observed.iter().zip(expected) {
            assert!((o - e).abs() < 0.01, "observed {observed:?}, expected {expected:?}");
        }
    }

    #[test]
    fn test_draw_single_converges_to_weights() {
        let sampler = WeightedSampler::default();
        let question = role();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let observed = frequencies(
            question.choices().options(),
            (0..DRAWS).map(|_| sampler.draw_single(&question, &mut rng).unwrap()),
        );
        assert_close(&observed, &[0.68, 0.25, 0.05, 0.02]);
    }

    #[test]
    fn test_draw_conditional_uses_override() {
        let sampler = WeightedSampler::default();
        let question = age();
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        let mut context = HashMap::new();
        context.insert("role".to_string(), Answer::Single("母亲".to_string()));

        let draws = (0..DRAWS).map(|_| match sampler.draw_conditional(&question, &context, &mut rng).unwrap() {
            Answer::Single(label) => label,
            other => panic!("expected single answer, got {other:?}"),
        });
        let observed = frequencies(question.choices().options(), draws);
        assert_close(&observed, &[0.02, 0.12, 0.45, 0.35, 0.06]);
    }

    #[test]
    fn test_draw_conditional_without_match_uses_base() {
        let sampler = WeightedSampler::default();
        let question = age();
        let mut rng = ChaCha8Rng::seed_from_u64(13);

        let mut context = HashMap::new();
        context.insert("role".to_string(), Answer::Single("父亲".to_string()));

        let draws = (0..DRAWS).map(|_| match sampler.draw_conditional(&question, &context, &mut rng).unwrap() {
            Answer::Single(label) => label,
            other => panic!("expected single answer, got {other:?}"),
        });
        let observed = frequencies(question.choices().options(), draws);
        assert_close(&observed, &[0.03, 0.07, 0.40, 0.30, 0.20]);
    }

    #[test]
    fn test_draws_are_reproducible_for_a_seed() {
        let sampler = WeightedSampler::new(PickPolicy::Uniform);
        let single = role();
        let multi = abilities(3);

        let run = |seed: u64| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            (0..200)
                .map(|_| {
                    (
                        sampler.draw_single(&single, &mut rng).unwrap(),
                        sampler.draw_multi(&multi, &mut rng).unwrap(),
                    )
                })
                .collect::<Vec<_>>()
        };

        assert_eq!(run(99), run(99));
        assert_ne!(run(99), run(100));
    }

    #[test]
    fn test_draw_multi_sizes_and_uniqueness() {
        let question = abilities(3);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        for policy in [PickPolicy::Uniform, PickPolicy::Fixed] {
            let sampler = WeightedSampler::new(policy);
            let mut sizes = HashSet::new();
            for _ in 0..2_000 {
                let picked = sampler.draw_multi(&question, &mut rng).unwrap();
                let unique: HashSet<_> = picked.iter().collect();
                assert_eq!(unique.len(), picked.len(), "duplicate in {picked:?}");
                assert!((1..=3).contains(&picked.len()));
                sizes.insert(picked.len());
            }
            match policy {
                PickPolicy::Fixed => assert_eq!(sizes, HashSet::from([3])),
                PickPolicy::Uniform => assert_eq!(sizes, HashSet::from([1, 2, 3])),
            }
        }
    }

    #[test]
    fn test_draw_multi_caps_at_positive_options() {
        let question = Question::multi("q", &["a", "b", "c", "d", "e"], &[5.0, 0.0, 3.0, 0.0, 1.0], 5).unwrap();
        let sampler = WeightedSampler::new(PickPolicy::Fixed);
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        for _ in 0..1_000 {
            let mut picked = sampler.draw_multi(&question, &mut rng).unwrap();
            picked.sort();
            assert_eq!(picked, vec!["a", "c", "e"]);
        }
    }

    #[test]
    fn test_draw_multi_reaches_cap_with_negligible_weights() {
        let question = Question::multi("q", &["a", "b"], &[1.0, 1e-17], 2).unwrap();
        let sampler = WeightedSampler::new(PickPolicy::Fixed);
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        for _ in 0..1_000 {
            let mut picked = sampler.draw_multi(&question, &mut rng).unwrap();
            picked.sort();
            assert_eq!(picked, vec!["a", "b"]);
        }

        let huge = Question::single("q", &["a", "b"], &[f64::MAX, f64::MAX]).unwrap();
        let draws = (0..DRAWS).map(|_| WeightedSampler::default().draw_single(&huge, &mut rng).unwrap());
        assert_close(&frequencies(huge.choices().options(), draws), &[0.5, 0.5]);
    }

    #[test]
    fn test_uniform_pick_count_converges() {
        let sampler = WeightedSampler::new(PickPolicy::Uniform);
        let mut rng = ChaCha8Rng::seed_from_u64(31);
        let mut counts = [0usize; 3];
        for _ in 0..DRAWS {
            counts[sampler.pick_count(3, &mut rng) - 1] += 1;
        }
        let shares: Vec<f64> = counts.iter().map(|c| *c as f64 / DRAWS as f64).collect();
        assert_close(&shares, &[1.0 / 3.0; 3]);

        let question = abilities(3);
        let mut sizes = [0usize; 3];
        for _ in 0..DRAWS {
            sizes[sampler.draw_multi(&question, &mut rng).unwrap().len() - 1] += 1;
        }
        let shares: Vec<f64> = sizes.iter().map(|c| *c as f64 / DRAWS as f64).collect();
        assert_close(&shares, &[1.0 / 3.0; 3]);
    }

    #[test]
    fn test_zero_weight_never_drawn() {
        let question = Question::single("q", &["a", "b", "c"], &[1.0, 0.0, 1.0]).unwrap();
        let sampler = WeightedSampler::default();
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        for _ in 0..10_000 {
            assert_ne!(sampler.draw_single(&question, &mut rng).unwrap(), "b");
        }
    }

    #[test]
    fn test_heavier_options_appear_more_often_in_multi() {
        let question = abilities(3);
        let sampler = WeightedSampler::new(PickPolicy::Fixed);
        let mut rng = ChaCha8Rng::seed_from_u64(23);

        let mut counts: HashMap<String, usize> = HashMap::new();
        for _ in 0..20_000 {
            for label in sampler.draw_multi(&question, &mut rng).unwrap() {
                *counts.entry(label).or_default() += 1;
            }
        }
        assert!(counts["创造力"] > counts["知识学习"]);
        assert!(counts["知识学习"] > counts["艺术兴趣"]);
        assert!(counts["艺术兴趣"] > counts["其他"]);
    }

    #[test]
    fn test_mode_mismatch() {
        let sampler = WeightedSampler::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        assert!(matches!(
            sampler.draw_single(&abilities(3), &mut rng),
            Err(SamplerError::ModeMismatch { expected: "single", .. })
        ));
        assert!(matches!(
            sampler.draw_multi(&role(), &mut rng),
            Err(SamplerError::ModeMismatch { expected: "multi", .. })
        ));
    }

    #[test]
    fn test_configured_weights_unchanged_by_draws() {
        let question = abilities(3);
        let before = question.choices().clone();
        let sampler = WeightedSampler::new(PickPolicy::Fixed);
        let mut rng = ChaCha8Rng::seed_from_u64(29);
        for _ in 0..100 {
            sampler.draw_multi(&question, &mut rng).unwrap();
        }
        assert_eq!(question.choices(), &before);
    }
}
