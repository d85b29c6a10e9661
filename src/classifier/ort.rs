use std::path::Path;

use anyhow::{Context, anyhow, bail};
use ndarray::Array2;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::{Tensor, ValueType};

use super::InferenceBackend;
use crate::{
    error::{PoseError, Result},
    types::FEATURE_LEN,
};

/// ONNX Runtime session wrapped as an [`InferenceBackend`].
pub struct OrtBackend {
    session: Session,
    num_labels: usize,
    input: Option<Array2<f32>>,
    outputs: Vec<Vec<f32>>,
}

impl OrtBackend {
    /// Builds a session for `model_path`; `num_labels` is the output width the
    /// model must declare, checked in [`allocate`](InferenceBackend::allocate).
    pub fn load(model_path: &Path, intra_threads: usize, num_labels: usize) -> Result<Self> {
        let session = build_session(model_path, intra_threads)
            .map_err(|err| PoseError::Configuration(format!("{err:#}")))?;

        Ok(Self {
            session,
            num_labels,
            input: None,
            outputs: Vec::new(),
        })
    }

    fn run(&mut self, input: Array2<f32>) -> anyhow::Result<Vec<Vec<f32>>> {
        let tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .context("failed to run pose classifier session")?;

        if outputs.len() == 0 {
            bail!("model returned no outputs");
        }

        let mut flattened = Vec::with_capacity(outputs.len());
        for idx in 0..outputs.len() {
            let values = outputs[idx].try_extract_array::<f32>()?;
            flattened.push(values.iter().copied().collect());
        }
        Ok(flattened)
    }
}

fn build_session(model_path: &Path, intra_threads: usize) -> anyhow::Result<Session> {
    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(intra_threads)?
        .commit_from_file(model_path)
        .with_context(|| format!("failed to load ORT session from {}", model_path.display()))?;
    Ok(session)
}

fn check_io(session: &Session, num_labels: usize) -> anyhow::Result<()> {
    if session.inputs.len() != 1 || session.outputs.len() != 1 {
        return Err(anyhow!(
            "expected a model with one input and one output, got {} inputs and {} outputs",
            session.inputs.len(),
            session.outputs.len()
        ));
    }

    check_dims(
        tensor_dims(&session.inputs[0].input_type),
        tensor_dims(&session.outputs[0].output_type),
        num_labels,
    )
}

fn tensor_dims(ty: &ValueType) -> Option<&[i64]> {
    match ty {
        ValueType::Tensor { shape, .. } => Some(&shape[..]),
        _ => None,
    }
}

/// Dynamic dimensions are reported as -1 and accepted.
fn check_dims(
    input: Option<&[i64]>,
    output: Option<&[i64]>,
    num_labels: usize,
) -> anyhow::Result<()> {
    if let Some(&features) = input.and_then(<[i64]>::last) {
        if features > 0 && features as usize != FEATURE_LEN {
            bail!("model input takes {features} features, keypoints provide {FEATURE_LEN}");
        }
    }
    if let Some(&classes) = output.and_then(<[i64]>::last) {
        if classes > 0 && classes as usize != num_labels {
            bail!("model outputs {classes} probabilities, label file has {num_labels} labels");
        }
    }
    Ok(())
}

impl InferenceBackend for OrtBackend {
    fn allocate(&mut self) -> Result<()> {
        check_io(&self.session, self.num_labels).map_err(|err| PoseError::Configuration(format!("{err:#}")))?;
        log::debug!(
            "pose classifier input {:?} -> output {:?}",
            self.session.inputs[0].name,
            self.session.outputs[0].name
        );
        Ok(())
    }

    fn set_input(&mut self, tensor_index: usize, data: &[f32]) -> Result<()> {
        if tensor_index >= self.session.inputs.len() {
            return Err(PoseError::InvalidArgument(format!(
                "input tensor {tensor_index} out of range"
            )));
        }
        let batch = Array2::from_shape_vec((1, data.len()), data.to_vec())
            .map_err(|err| PoseError::InvalidArgument(format!("bad input shape: {err}")))?;
        self.input = Some(batch);
        Ok(())
    }

    fn invoke(&mut self) -> Result<()> {
        let input = self
            .input
            .take()
            .ok_or_else(|| PoseError::Inference("input tensor was not set".to_string()))?;
        self.outputs = self
            .run(input)
            .map_err(|err| PoseError::Inference(format!("{err:#}")))?;
        Ok(())
    }

    fn get_output(&self, tensor_index: usize) -> Result<Vec<f32>> {
        self.outputs.get(tensor_index).cloned().ok_or_else(|| {
            PoseError::Inference(format!("output tensor {tensor_index} is not available"))
        })
    }
}



#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_dims_are_accepted() {
        check_dims(Some(&[1, 51]), Some(&[1, 5]), 5).unwrap();
        check_dims(Some(&[-1, 51]), Some(&[-1, 5]), 5).unwrap();
    }

    #[test]
    fn dynamic_or_unknown_dims_are_accepted() {
        check_dims(Some(&[-1, -1]), Some(&[-1, -1]), 5).unwrap();
        check_dims(None, None, 5).unwrap();
    }

    #[test]
    fn output_width_must_match_label_count() {
        let err = check_dims(Some(&[1, 51]), Some(&[1, 4]), 5).unwrap_err();
        assert!(err.to_string().contains("4 probabilities"));
        assert!(err.to_string().contains("5 labels"));
    }

    #[test]
    fn input_width_must_match_feature_length() {
        let err = check_dims(Some(&[1, 34]), Some(&[1, 5]), 5).unwrap_err();
        assert!(err.to_string().contains("34 features"));
    }
}
