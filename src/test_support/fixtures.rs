//! On-disk fixtures: CMake projects and fake SDK installations.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::core::catalog::{IOS_TOOLCHAIN_FILE, WINDOWS_TOOLCHAIN_FILE};
use crate::core::env::Environment;
use crate::core::platform::HostOs;
use crate::core::request::BUILD_DESCRIPTOR;

const CMAKELISTS: &str = "cmake_minimum_required(VERSION 3.16)\nproject(fixture C CXX)\nadd_library(fixture STATIC fixture.c)\ninstall(TARGETS fixture)\n";

/// A temporary directory holding a minimal CMake project.
pub fn cmake_project() -> TempDir {
    let tmp = TempDir::new().expect("failed to create temp dir");
    std::fs::write(tmp.path().join(BUILD_DESCRIPTOR), CMAKELISTS).expect("failed to write CMakeLists.txt");
    std::fs::write(tmp.path().join("fixture.c"), "int fixture(void) { return 0; }\n")
        .expect("failed to write fixture.c");
    tmp
}

fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("failed to create fixture dir");
    }
    std::fs::write(path, "# fixture\n").expect("failed to write fixture file");
}

/// Every SDK and bundled toolchain file the catalog can ask for, laid out
/// under one temp dir, plus an [`Environment`] pointing at them.
pub struct SdkFixture {
    _root: TempDir,
    ndk_root: PathBuf,
    msvc_root: PathBuf,
    pub env: Environment,
}

impl SdkFixture {
    pub fn new(host: HostOs) -> Self {
        let root = TempDir::new().expect("failed to create temp dir");
        let ndk_root = root.path().join("android-ndk");
        let ohos_root = root.path().join("ohos-ndk");
        let msvc_root = root.path().join("msvc-wine");
        let toolchains_dir = root.path().join("toolchains");

        touch(&ndk_root.join("build/cmake/android.toolchain.cmake"));
        touch(&ohos_root.join("build/cmake/ohos.toolchain.cmake"));
        for abi in ["x64", "x86", "arm64"] {
            touch(&msvc_root.join("bin").join(abi).join("msvcenv.sh"));
        }
        for abi in [
            "aarch64-linux-gnu",
            "arm-linux-gnueabihf",
            "riscv64-rvv-linux-gnu",
            "riscv64-linux-gnu",
        ] {
            touch(&toolchains_dir.join(format!("{}.toolchain.cmake", abi)));
        }
        touch(&toolchains_dir.join(IOS_TOOLCHAIN_FILE));
        touch(&toolchains_dir.join(WINDOWS_TOOLCHAIN_FILE));

        let env = Environment::new(host, "x86_64", &toolchains_dir)
            .with_var("NDK_ROOT", ndk_root.display().to_string())
            .with_var("OHOS_NDK_ROOT", ohos_root.display().to_string())
            .with_var("MSVC_WINE_ROOT", msvc_root.display().to_string());

        SdkFixture {
            _root: root,
            ndk_root,
            msvc_root,
            env,
        }
    }

    pub fn ndk_root(&self) -> &Path {
        &self.ndk_root
    }

    pub fn msvc_root(&self) -> &Path {
        &self.msvc_root
    }
}
