use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use super::data::{TrainingData, TrainingInstance};
use super::PerceptronParams;

/// Score every label for one instance. `weights` is attribute-major.
pub(crate) fn label_scores(
    features: impl IntoIterator<Item = (u32, f64)>,
    weights: &[f64],
    num_labels: usize,
) -> Vec<f64> {
    let mut scores = vec![0.0; num_labels];
    for (attr, value) in features {
        let row = attr as usize * num_labels;
        if let Some(row) = weights.get(row..row + num_labels) {
            for (score, weight) in scores.iter_mut().zip(row) {
                *score += weight * value;
            }
        }
    }
    scores
}

/// Index of the best score; ties go to the lowest label id
pub(crate) fn argmax(scores: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (label, score) in scores.iter().enumerate() {
        match best {
            Some(b) if scores[b] >= *score => {}
            _ => best = Some(label),
        }
    }
    best
}

fn predict(instance: &TrainingInstance, weights: &[f64], num_labels: usize) -> usize {
    let scores = label_scores(instance.features.iter().copied(), weights, num_labels);
    argmax(&scores).unwrap_or(0)
}

/// Train a multiclass averaged perceptron and return the averaged weights,
/// laid out as `weights[attr * num_labels + label]`.
pub(crate) fn train(data: &TrainingData, params: &PerceptronParams) -> Vec<f64> {
    let num_labels = data.num_labels;
    let num_weights = data.attrs.len() * num_labels;
    let num_instances = data.instances.len() as f64;

    let mut weights = vec![0.0; num_weights];
    let mut summed_updates = vec![0.0; num_weights];
    let mut c = 1.0;

    let mut order: Vec<usize> = (0..data.instances.len()).collect();
    let mut rng = match params.shuffle_seed() {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    debug!(
        instances = data.instances.len(),
        attributes = data.attrs.len(),
        labels = num_labels,
        "training averaged perceptron"
    );

    for epoch in 0..params.max_iterations() {
        let mut loss = 0.0;
        if order.len() > 1 {
            order.shuffle(&mut rng);
        }

        for &idx in &order {
            let instance = &data.instances[idx];
            let gold = instance.label as usize;
            let predicted = predict(instance, &weights, num_labels);
            if predicted != gold {
                for &(attr, value) in &instance.features {
                    let row = attr as usize * num_labels;
                    weights[row + gold] += value;
                    summed_updates[row + gold] += c * value;
                    weights[row + predicted] -= value;
                    summed_updates[row + predicted] -= c * value;
                }
                loss += 1.0;
            }
            c += 1.0;
        }

        let error_rate = if num_instances > 0.0 {
            loss / num_instances
        } else {
            0.0
        };
        debug!(epoch = epoch + 1, error_rate, "perceptron epoch");

        if error_rate < params.epsilon() {
            debug!(epoch = epoch + 1, "perceptron converged");
            break;
        }
    }

    for (weight, summed) in weights.iter_mut().zip(&summed_updates) {
        *weight -= summed / c;
    }
    weights
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> TrainingData {
        let mut data = TrainingData::default();
        let a = data.attrs.get_or_insert("a");
        let b = data.attrs.get_or_insert("b");
        data.num_labels = 2;
        data.instances = vec![
            TrainingInstance { features: vec![(a, 1.0)], label: 0 },
            TrainingInstance { features: vec![(b, 1.0)], label: 1 },
            TrainingInstance { features: vec![(a, 2.0)], label: 0 },
            TrainingInstance { features: vec![(b, 2.0)], label: 1 },
        ];
        data
    }

    #[test]
    fn test_argmax_prefers_lowest_id_on_ties() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0]), Some(1));
        assert_eq!(argmax(&[0.0, 0.0]), Some(0));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_label_scores_ignore_unknown_attributes() {
        let weights = [1.0, -1.0, 0.5, 2.0];
        let scores = label_scores(vec![(0, 2.0), (1, 1.0), (9, 5.0)], &weights, 2);
        assert_eq!(scores, vec![2.5, 0.0]);
    }

    #[test]
    fn test_learns_separable_data() {
        let data = separable();
        let params = PerceptronParams::default().with_shuffle_seed(42);
        let weights = train(&data, &params);
        assert_eq!(weights.len(), 4);
        for instance in &data.instances {
            assert_eq!(predict(instance, &weights, 2), instance.label as usize);
        }
    }

    #[test]
    fn test_same_seed_same_weights() {
        let data = separable();
        let params = PerceptronParams::default()
            .with_max_iterations(3)
            .unwrap()
            .with_shuffle_seed(7);
        assert_eq!(train(&data, &params), train(&data, &params));
    }

    #[test]
    fn test_no_instances() {
        let weights = train(&TrainingData::default(), &PerceptronParams::default());
        assert!(weights.is_empty());
    }
}
