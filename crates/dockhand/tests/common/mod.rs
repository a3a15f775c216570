use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// スタブの git / docker と設定ファイルを持つテスト環境
pub struct TestEnv {
    pub root: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    /// 指定したプログラムを使う設定ファイルを書き出す
    pub fn write_config(&self, git: &Path, docker: &Path) -> PathBuf {
        let path = self.root.path().join("dockhand.yml");
        let content = format!(
            "scratch-root: {}\ngit: {}\ndocker: {}\n",
            self.root.path().join("scratch").display(),
            git.display(),
            docker.display()
        );
        fs::write(&path, content).unwrap();
        path
    }

    /// 常に成功する git / docker スタブ
    #[cfg(unix)]
    #[allow(dead_code)]
    pub fn write_stubs(&self) -> (PathBuf, PathBuf) {
        let git = self.write_script(
            "git",
            r#"for dest; do :; done
echo "Cloning into '$dest'..."
mkdir -p "$dest"
printf 'FROM alpine\n' > "$dest/Dockerfile"
"#,
        );
        let docker = self.write_script(
            "docker",
            r#"case "$1" in
  build) echo "Successfully tagged $5" ;;
  login) read -r password; echo "login with $password"; echo "Login Succeeded" ;;
  push) echo "The push refers to repository [$2]" ;;
esac
exit 0
"#,
        );
        (git, docker)
    }

    #[cfg(unix)]
    fn write_script(&self, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = self.root.path().join(name);
        fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }
}
