use anyhow::Result;
use relief::PointHeightResolver;
use serde::Serialize;

use crate::PipelineArgs;

#[derive(Serialize)]
struct HeightResponse {
    height: String,
    selected: bool,
}

pub fn run(pipeline: &PipelineArgs, value: Option<f64>, json: bool) -> Result<()> {
    let resolver = PointHeightResolver::new(pipeline.apply_offset, pipeline.offset);
    let height = resolver.readout(value);

    if json {
        let response = HeightResponse {
            height,
            selected: value.is_some(),
        };
        println!("{}", serde_json::to_string(&response)?);
    } else {
        println!("{height}");
    }

    Ok(())
}
