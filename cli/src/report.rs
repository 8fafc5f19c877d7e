use std::collections::HashMap;

use anyhow::Result;
use vision_prep::prelude::*;
use vision_prep::tract_onnx::prelude::TypedFact;
use vision_prep::tract_onnx::prelude::tract_ndarray::Axis;

#[derive(Debug)]
pub struct ChannelStats {
    pub channel: usize,
    pub mean: f32,
    pub min: f32,
    pub max: f32,
}

pub fn channel_stats(tensor: &Tensor, layout: &Layout) -> Result<Vec<ChannelStats>> {
    let view = tensor.to_array_view::<f32>()?;
    let axis = Axis(layout.channel_axis());
    Ok((0..view.shape()[axis.0])
        .map(|channel| {
            let lane = view.index_axis(axis, channel);
            ChannelStats {
                channel,
                mean: lane.mean().unwrap_or(f32::NAN),
                min: lane.iter().copied().fold(f32::INFINITY, f32::min),
                max: lane.iter().copied().fold(f32::NEG_INFINITY, f32::max),
            }
        })
        .collect())
}

pub fn classification_lines(
    image: &str,
    classification: &Classification,
    top: usize,
    labels: Option<&[String]>,
) -> Vec<String> {
    let label = labels
        .and_then(|labels| labels.get(classification.index))
        .map(String::as_str)
        .unwrap_or("-");
    let mut lines = vec![format!(
        "{image} --> {} {label} ({:.4})",
        classification.index,
        classification.probability()
    )];
    for prediction in classification.predictions(top, labels).iter().skip(1) {
        lines.push(format!(
            "    {:>5} {:<24} {:.4}",
            prediction.index,
            prediction.label.as_deref().unwrap_or("-"),
            prediction.probability
        ));
    }
    lines
}

pub fn print_classification(
    image: &str,
    classification: &Classification,
    top: usize,
    labels: Option<&[String]>,
) {
    for line in classification_lines(image, classification, top, labels) {
        println!("{line}");
    }
}

fn fact_line(name: &str, fact: &TypedFact) -> String {
    let shape: Vec<String> = fact.shape.iter().map(|d| d.to_string()).collect();
    format!("    {name}: {:?} [{}]", fact.datum_type, shape.join(", "))
}

/// Names, element types and shapes of a model's inputs and outputs.
pub fn model_info_lines(session: &OnnxSession) -> Vec<String> {
    let mut lines = vec!["inputs:".to_string()];
    lines.extend(session.input_names().iter().zip(session.input_facts()).map(|(n, f)| fact_line(n, f)));
    lines.push("outputs:".to_string());
    lines.extend(
        session.output_names().iter().zip(session.output_facts()).map(|(n, f)| fact_line(n, f)),
    );
    lines
}

pub fn print_raw(image: &str, outputs: &HashMap<String, Tensor>) {
    let mut names: Vec<&String> = outputs.keys().collect();
    names.sort();
    println!("{image}");
    for name in names {
        let t = &outputs[name];
        println!("    {name}: {:?} {:?}", t.datum_type(), t.shape());
    }
}
