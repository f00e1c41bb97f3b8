//! Subprocess-backed face oracle.
//!
//! The external detection/encoding capability is reached through a
//! helper program configured via `ROLLCALL_ORACLE_CMD`. Protocol, one
//! invocation per call, PNG on stdin, JSON on stdout:
//!
//! ```text
//! helper detect                      -> [{"x":..,"y":..,"width":..,"height":..}, ...]
//! helper encode <x> <y> <w> <h>      -> [0.12, -0.03, ...] | null
//! ```
//!
//! Calls are bounded synchronous operations run off the async runtime.

use std::io::{Cursor, Write};
use std::process::{Command, Stdio};

use image::{ImageFormat, RgbImage};
use rollcall_core::{Descriptor, FaceOracle, FaceRegion, OracleError};

pub struct CommandOracle {
    program: String,
}

impl CommandOracle {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, args: &[String], image: &RgbImage) -> Result<Vec<u8>, OracleError> {
        let png = encode_png(image)?;

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| OracleError::Invocation(format!("{}: {e}", self.program)))?;

        // stdin is piped above, so take() cannot return None.
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&png)
                .map_err(|e| OracleError::Invocation(format!("write stdin: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| OracleError::Invocation(format!("wait: {e}")))?;
        if !output.status.success() {
            return Err(OracleError::Invocation(format!(
                "{} exited with {}",
                self.program, output.status
            )));
        }
        Ok(output.stdout)
    }
}

impl FaceOracle for CommandOracle {
    fn detect(&self, image: &RgbImage) -> Result<Vec<FaceRegion>, OracleError> {
        let stdout = self.run(&["detect".to_string()], image)?;
        serde_json::from_slice(&stdout)
            .map_err(|e| OracleError::MalformedOutput(format!("detect: {e}")))
    }

    fn encode(
        &self,
        image: &RgbImage,
        region: &FaceRegion,
    ) -> Result<Option<Descriptor>, OracleError> {
        let args = vec![
            "encode".to_string(),
            region.x.to_string(),
            region.y.to_string(),
            region.width.to_string(),
            region.height.to_string(),
        ];
        let stdout = self.run(&args, image)?;
        let values: Option<Vec<f32>> = serde_json::from_slice(&stdout)
            .map_err(|e| OracleError::MalformedOutput(format!("encode: {e}")))?;
        Ok(values.map(Descriptor::new))
    }
}

fn encode_png(image: &RgbImage) -> Result<Vec<u8>, OracleError> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| OracleError::Invocation(format!("png encode: {e}")))?;
    Ok(buf)
}
