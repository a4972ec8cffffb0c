use std::{
    io::{prelude::*, BufWriter},
    path::{Path, PathBuf},
};

use serde::Serialize;
use serde_json::json;
use vid_sim_finder_lib::SimilarityGroup;

use super::OutputFormat;

#[derive(Debug, Clone)]
pub struct SearchOutput {
    sim_groups: Vec<SimilarityGroup<PathBuf>>,
}

impl SearchOutput {
    pub fn new(sim_groups: Vec<SimilarityGroup<PathBuf>>) -> Self {
        Self { sim_groups }
    }

    pub fn len(&self) -> usize {
        self.sim_groups.len()
    }

    pub fn write(&self, format: OutputFormat, out: impl Write) -> std::io::Result<()> {
        let mut out = BufWriter::new(out);
        match format {
            OutputFormat::Normal => {
                for group in &self.sim_groups {
                    writeln!(out, "similarity group {}:", group.similarity_id())?;
                    for path in group.members() {
                        writeln!(out, "{}", path.display())?;
                    }
                    writeln!(out)?;
                }
            }

            OutputFormat::Json => {
                //Struct only exists to be serialized.
                #[derive(Serialize)]
                struct JsonStruct<'a> {
                    similarity_id: u32,
                    members: Vec<&'a Path>,
                }

                let output_vec: Vec<JsonStruct> = self
                    .sim_groups
                    .iter()
                    .map(|group| JsonStruct {
                        similarity_id: group.similarity_id(),
                        members: group.members().map(PathBuf::as_path).collect(),
                    })
                    .collect();

                serde_json::to_writer_pretty(&mut out, &json!(output_vec))?;
                writeln!(out)?;
            }
        }

        out.flush()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn output() -> SearchOutput {
        let group = SimilarityGroup::new(3, [PathBuf::from("/a.png"), PathBuf::from("/b.png")]).unwrap();
        SearchOutput::new(vec![group])
    }

    #[test]
    fn test_normal_output() {
        let mut buf = vec![];
        output().write(OutputFormat::Normal, &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "similarity group 3:\n/a.png\n/b.png\n\n"
        );
    }

    #[test]
    fn test_json_output() {
        let mut buf = vec![];
        output().write(OutputFormat::Json, &mut buf).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(
            parsed,
            json!([{"similarity_id": 3, "members": ["/a.png", "/b.png"]}])
        );
    }
}
