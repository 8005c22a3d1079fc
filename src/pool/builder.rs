//! Record builder: one sampler call per question, in draw order.

use crate::models::{Record, SamplerError, Survey};
use crate::sampler::WeightedSampler;
use rand::Rng;
use std::sync::Arc;

/// Builds complete records from a shared survey.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    survey: Arc<Survey>,
    sampler: WeightedSampler,
}

impl RecordBuilder {
    pub fn new(survey: Arc<Survey>, sampler: WeightedSampler) -> Self {
        Self { survey, sampler }
    }

    /// Draw every question for one respondent.
    ///
    /// Trigger questions are drawn before the questions they condition, and
    /// each draw sees the answers drawn so far. On error nothing is returned,
    /// so a half-built record never escapes.
    pub fn build<R: Rng>(&self, respondent: usize, rng: &mut R) -> Result<Record, SamplerError> {
        let mut record = Record::new(respondent);
        for question in self.survey.draw_order() {
            let answer = self.sampler.draw_conditional(question, &record.answers, rng)?;
            record.insert(question.id(), answer);
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Answer, Config, PickPolicy, Question};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    fn scenario_survey() -> Survey {
        let role = Question::single("身份", &["母亲", "父亲", "祖父母", "其他亲属"], &[68.0, 25.0, 5.0, 2.0]).unwrap();
        let abilities = Question::multi(
            "能力培养",
            &["创造力", "规则意识", "情绪管理", "知识学习", "运动能力", "艺术兴趣", "其他"],
            &[52.0, 48.0, 45.0, 35.0, 28.0, 15.0, 4.0],
            3,
        )
        .unwrap();
        Survey::new(vec![role, abilities]).unwrap()
    }

    #[test]
    fn test_312_records_scenario() {
        let builder = RecordBuilder::new(Arc::new(scenario_survey()), WeightedSampler::default());
        let roles: HashSet<&str> = ["母亲", "父亲", "祖父母", "其他亲属"].into_iter().collect();
        let mut rng = ChaCha8Rng::seed_from_u64(312);

        for respondent in 0..312 {
            let record = builder.build(respondent, &mut rng).unwrap();
            assert_eq!(record.respondent, respondent);
            assert_eq!(record.answers.len(), 2);

            match record.get("身份").unwrap() {
                Answer::Single(label) => assert!(roles.contains(label.as_str())),
                other => panic!("expected single answer, got {other:?}"),
            }

            match record.get("能力培养").unwrap() {
                Answer::Multi(labels) => {
                    assert!(!labels.is_empty() && labels.len() <= 3);
                    let unique: HashSet<_> = labels.iter().collect();
                    assert_eq!(unique.len(), labels.len());
                }
                other => panic!("expected multi answer, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_example_survey_conditions_age_on_role() {
        let survey = Config::example().unwrap().survey().unwrap();
        let builder = RecordBuilder::new(Arc::new(survey), WeightedSampler::new(PickPolicy::Fixed));
        let mut rng = ChaCha8Rng::seed_from_u64(2024);

        let mut mothers = 0usize;
        let mut young_mothers = 0usize;
        for respondent in 0..20_000 {
            let record = builder.build(respondent, &mut rng).unwrap();
            assert_eq!(record.answers.len(), 5);
            assert_eq!(record.get("Q4_能力培养").unwrap().len(), 3);
            if record.get("Q1_身份").unwrap().contains("母亲") {
                mothers += 1;
                if record.get("Q2_年龄").unwrap().contains("26-30岁") {
                    young_mothers += 1;
                }
            }
        }

        // 12% under the override, against 7% for the base distribution.
        let share = young_mothers as f64 / mothers as f64;
        assert!((share - 0.12).abs() < 0.015, "share {share}");
    }
}
