use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::ToolConfig;
use crate::helper_functions::read_csv;
use crate::models::{LoadedMutations, MutationLoader, MutationRecord, VariantReportEntry};
use crate::prediction_tools::ExternalTool;

/// Loads MAF/VCF files through an external script that annotates the variants
/// against transcripts.
///
/// Called as `<script> --input <file> --transcripts-out <csv> --variants-out <csv>
/// --report-out <json>`; the report is a JSON array of [`VariantReportEntry`].
pub struct ScriptMutationLoader {
    tool: ExternalTool,
}

impl ScriptMutationLoader {
    pub fn new(tool: ExternalTool) -> Self {
        Self { tool }
    }

    pub fn from_config(config: &ToolConfig) -> Result<Self> {
        Ok(Self::new(ExternalTool::new(
            "mutation loader",
            config.interpreter()?,
            config.mutation_loader.clone(),
        )))
    }
}

impl MutationLoader for ScriptMutationLoader {
    fn load(&self, path: &Path) -> Result<LoadedMutations> {
        let workdir = tempfile::tempdir()?;
        let transcripts_path = workdir.path().join("transcripts.csv");
        let variants_path = workdir.path().join("variants.csv");
        let report_path = workdir.path().join("report.json");

        info!("Loading mutations from {}", path.display());
        let mut command = self.tool.command();
        command
            .arg("--input")
            .arg(path)
            .arg("--transcripts-out")
            .arg(&transcripts_path)
            .arg("--variants-out")
            .arg(&variants_path)
            .arg("--report-out")
            .arg(&report_path);
        self.tool.run(command)?;

        let transcripts = read_csv(&transcripts_path)
            .with_context(|| format!("reading transcript mutations for {}", path.display()))?;
        let raw_variants = read_csv(&variants_path)
            .with_context(|| format!("reading genomic variants for {}", path.display()))?;
        let report_file = File::open(&report_path)
            .with_context(|| format!("opening variant report for {}", path.display()))?;
        let report: Vec<VariantReportEntry> = serde_json::from_reader(BufReader::new(report_file))
            .with_context(|| format!("parsing variant report for {}", path.display()))?;

        Ok(LoadedMutations {
            transcripts,
            raw_variants,
            report,
        })
    }
}

fn cell<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Prints each genomic variant applied to each transcript, with either the
/// resulting protein change or the reason it failed, followed by the coding
/// mutations that will be scored.
pub fn print_mutation_report(
    path: &Path,
    loaded: &LoadedMutations,
    out: &mut impl Write,
) -> Result<()> {
    let coding = MutationRecord::from_frame(&loaded.transcripts)?;

    writeln!(out, "Mutation report for {}", path.display())?;
    writeln!(
        out,
        "  {} genomic variants, {} transcript mutations",
        loaded.raw_variants.height(),
        coding.len()
    )?;
    for entry in &loaded.report {
        writeln!(
            out,
            "  {}:{} {}>{} {}: {}",
            entry.chr,
            entry.pos,
            entry.ref_allele,
            entry.alt_allele,
            entry.transcript_id.as_deref().unwrap_or("-"),
            entry.outcome
        )?;
    }
    for record in &coding {
        writeln!(
            out,
            "  {} {} {} [{}-{}]",
            cell(record.gene.as_deref()),
            cell(record.transcript_id.as_deref()),
            cell(record.description.as_deref()),
            cell(record.mutation_start),
            cell(record.mutation_end)
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    fn loaded() -> LoadedMutations {
        LoadedMutations {
            transcripts: df![
                "Gene" => &["TP53"],
                "stable_id_transcript" => &["ENST00000269305"],
                "MutationStart" => &[175i64],
                "MutationEnd" => &[175i64],
                "GeneMutationInfo" => &["p.R175H"]
            ]
            .unwrap(),
            raw_variants: df![
                "chr" => &["17", "17"],
                "pos" => &[7675088i64, 7676154],
                "ref" => &["C", "G"],
                "alt" => &["T", "A"]
            ]
            .unwrap(),
            report: vec![
                VariantReportEntry {
                    chr: "17".to_string(),
                    pos: 7675088,
                    ref_allele: "C".to_string(),
                    alt_allele: "T".to_string(),
                    transcript_id: Some("ENST00000269305".to_string()),
                    outcome: "p.R175H".to_string(),
                },
                VariantReportEntry {
                    chr: "17".to_string(),
                    pos: 7676154,
                    ref_allele: "G".to_string(),
                    alt_allele: "A".to_string(),
                    transcript_id: None,
                    outcome: "intronic".to_string(),
                },
            ],
        }
    }

    #[test]
    fn report_lists_variants_and_coding_mutations() {
        let mut out = Vec::new();
        print_mutation_report(Path::new("cohort/P1.maf"), &loaded(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Mutation report for cohort/P1.maf\n"));
        assert!(text.contains("2 genomic variants, 1 transcript mutations"));
        assert!(text.contains("17:7675088 C>T ENST00000269305: p.R175H"));
        assert!(text.contains("17:7676154 G>A -: intronic"));
        assert!(text.contains("TP53 ENST00000269305 p.R175H [175-175]"));
    }

    #[test]
    fn report_prints_absent_transcript_fields_as_dashes() {
        let mut mutations = loaded();
        mutations.transcripts = mutations.transcripts.drop("stable_id_transcript").unwrap();
        let mut out = Vec::new();
        print_mutation_report(Path::new("cohort/P1.maf"), &mutations, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("TP53 - p.R175H [175-175]"));
    }

    #[test]
    fn report_entries_deserialize_from_loader_json() {
        let json = r#"[{"chr": "12", "pos": 25245350, "ref": "C", "alt": "T",
                        "transcript_id": "ENST00000256078", "outcome": "p.G12D"},
                       {"chr": "1", "pos": 100, "ref": "A", "alt": "G", "outcome": "no transcript"}]"#;
        let entries: Vec<VariantReportEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].alt_allele, "T");
        assert_eq!(entries[1].transcript_id, None);
    }

    #[cfg(unix)]
    #[test]
    fn loader_script_outputs_are_collected() {
        use std::fs;
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("load.sh");
        fs::write(
            &script,
            "while [ $# -gt 0 ]; do\n\
             case \"$1\" in\n\
             --transcripts-out) printf 'Gene,stable_id_transcript,MutationStart,MutationEnd,GeneMutationInfo\\nKRAS,ENST00000256078,12,12,p.G12D\\n' > \"$2\" ;;\n\
             --variants-out) printf 'chr,pos,ref,alt\\n12,25245350,C,T\\n' > \"$2\" ;;\n\
             --report-out) printf '[]' > \"$2\" ;;\n\
             esac\n\
             shift\n\
             done\n",
        )
        .unwrap();
        let loader = ScriptMutationLoader::new(ExternalTool::new(
            "mutation loader",
            std::path::PathBuf::from("/bin/sh"),
            script,
        ));

        let loaded = loader.load(&dir.path().join("P1.maf")).unwrap();
        assert_eq!(loaded.transcripts.height(), 1);
        assert_eq!(loaded.raw_variants.height(), 1);
        assert!(loaded.report.is_empty());
    }
}
