//! Sandbox for running `segmask` against shell-script collaborators.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const PREDICT_SH: &str = r#"
while [ $# -gt 0 ]; do
  case "$1" in
    --out-dir) out="$2"; shift 2 ;;
    --case) case_dir="$2"; shift 2 ;;
    *) shift ;;
  esac
done
prob="$out/$(basename "$case_dir")_prob.nii.gz"
echo "predicting $case_dir"
: > "$prob"
echo "$prob"
"#;

const POSTPROCESS_SH: &str = r#"
while [ $# -gt 0 ]; do
  case "$1" in
    --prob) prob="$2"; shift 2 ;;
    --output) output="$2"; shift 2 ;;
    *) shift ;;
  esac
done
cp "$prob" "$output"
"#;

const EVALUATE_SH: &str = "echo scoring >&2\necho '[0.21, 0.95]'\n";

pub struct Sandbox {
    pub temp: TempDir,
}

impl Sandbox {
    /// Models root with `t1-flair`, working collaborators, an empty HOME.
    pub fn new() -> Self {
        let sandbox = Self { temp: TempDir::new().unwrap() };
        sandbox.add_model("t1-flair", &["t1", "flair"]);
        sandbox.write_config(PREDICT_SH);
        sandbox
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn models_dir(&self) -> PathBuf {
        self.root().join("models")
    }

    pub fn add_model(&self, name: &str, channels: &[&str]) -> PathBuf {
        let dir = self.models_dir().join(name);
        std::fs::create_dir_all(dir.join("checkpoints")).unwrap();
        std::fs::write(dir.join("checkpoints/epoch_0.30.hdf5"), b"w").unwrap();
        std::fs::write(dir.join("checkpoints/epoch_0.12.hdf5"), b"w").unwrap();
        let params = serde_json::json!({
            "data_prefix": channels,
            "model_dir": "same",
            "loss": "dice",
            "metrics": ["accuracy"],
        });
        let param_file = dir.join(format!("{name}.json"));
        std::fs::write(&param_file, params.to_string()).unwrap();
        param_file
    }

    /// Rewrite the configuration with a different predict script.
    pub fn write_config(&self, predict_script: &str) {
        let scripts = self.root().join("scripts");
        std::fs::create_dir_all(&scripts).unwrap();
        for (name, body) in [("predict.sh", predict_script), ("postprocess.sh", POSTPROCESS_SH), ("evaluate.sh", EVALUATE_SH)] {
            std::fs::write(scripts.join(name), body).unwrap();
        }

        let command = |name: &str| format!("[\"sh\", {:?}]", scripts.join(name).display().to_string());
        let config = format!(
            "models_dir = {:?}\n\n[backend]\npredict = {}\npostprocess = {}\nevaluate = {}\n",
            self.models_dir().display().to_string(),
            command("predict.sh"),
            command("postprocess.sh"),
            command("evaluate.sh"),
        );
        std::fs::write(self.root().join("segmask.toml"), config).unwrap();
    }

    pub fn touch(&self, relative: &str) -> PathBuf {
        let path = self.root().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"").unwrap();
        path
    }

    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("segmask").unwrap();
        cmd.current_dir(self.root())
            .env("HOME", self.root())
            .env("SEGMASK_CONFIG", self.root().join("segmask.toml"))
            .env_remove("SEGMASK_MODELS_DIR");
        cmd
    }
}
