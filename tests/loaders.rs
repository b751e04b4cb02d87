//! File loaders against real temp files: Matrix-Market, run CSVs, and
//! kernel configs.

use std::io::Write;

use ellbench::config::KernelConfig;
use ellbench::error::Error;
use ellbench::matrix::CooMatrix;
use ellbench::run::Run;
use tempfile::NamedTempFile;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn loads_general_real_matrix() {
    let file = write_temp(
        "%%MatrixMarket matrix coordinate real general\n\
         % a comment line\n\
         3 3 3\n\
         1 1 1.5\n\
         2 3 2.5\n\
         3 1 -1.0\n",
    );
    let m = CooMatrix::<f32>::from_file(file.path()).unwrap();
    assert_eq!(m.height(), 3);
    assert_eq!(m.width(), 3);
    assert_eq!(m.nonzeros(), 3);
    // indices corrected to 0-based
    assert!(m.triples().contains(&(1, 2, 2.5)));
    assert!(m.triples().contains(&(2, 0, -1.0)));
}

#[test]
fn symmetric_matrix_mirrors_off_diagonal_entries() {
    let file = write_temp(
        "%%MatrixMarket matrix coordinate real symmetric\n\
         3 3 3\n\
         1 1 4.0\n\
         2 1 1.0\n\
         3 2 2.0\n",
    );
    let m = CooMatrix::<f32>::from_file(file.path()).unwrap();
    // two mirrored off-diagonal entries, diagonal not duplicated
    assert_eq!(m.entry_count(), 5);
    assert!(m.triples().contains(&(1, 0, 1.0)));
    assert!(m.triples().contains(&(0, 1, 1.0)));
    assert_eq!(
        m.triples().iter().filter(|&&(i, j, _)| i == 0 && j == 0).count(),
        1
    );
}

#[test]
fn pattern_entries_default_to_one() {
    let file = write_temp(
        "%%MatrixMarket matrix coordinate pattern general\n\
         2 2 2\n\
         1 1\n\
         2 2\n",
    );
    let m = CooMatrix::<f32>::from_file(file.path()).unwrap();
    assert!(m.triples().iter().all(|&(_, _, v)| v == 1.0));
}

#[test]
fn bad_banner_is_a_load_error() {
    let file = write_temp("%%MatrixMarket matrix array real general\n2 2 1\n1 1 1.0\n");
    let err = CooMatrix::<f32>::from_file(file.path()).unwrap_err();
    assert!(matches!(err, Error::Load { .. }));
}

#[test]
fn out_of_range_index_is_a_load_error() {
    let file = write_temp("%%MatrixMarket matrix coordinate real general\n2 2 1\n3 1 1.0\n");
    assert!(CooMatrix::<f32>::from_file(file.path()).is_err());
}

#[test]
fn truncated_entry_list_is_a_load_error() {
    let file = write_temp("%%MatrixMarket matrix coordinate real general\n3 3 5\n1 1 1.0\n");
    let err = CooMatrix::<f32>::from_file(file.path()).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("expected 5 entries"), "got: {msg}");
}

#[test]
fn non_square_matrix_fails_the_shape_check_with_exit_code_2() {
    let file = write_temp(
        "%%MatrixMarket matrix coordinate real general\n\
         2 3 1\n\
         1 1 1.0\n",
    );
    let m = CooMatrix::<f32>::from_file(file.path()).unwrap();
    let err = m.require_square().unwrap_err();
    assert!(matches!(err, Error::NotSquare { rows: 2, cols: 3 }));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn integer_matrix_loads_into_integer_semiring() {
    let file = write_temp(
        "%%MatrixMarket matrix coordinate integer general\n\
         2 2 2\n\
         1 2 7\n\
         2 1 -3\n",
    );
    let m = CooMatrix::<i32>::from_file(file.path()).unwrap();
    assert!(m.triples().contains(&(0, 1, 7)));
    assert!(m.triples().contains(&(1, 0, -3)));
}

#[test]
fn run_csv_loads_all_rows_and_skips_blanks() {
    let file = write_temp("1024,1,1,128,1,1\n\n2048, 1, 1, 256, 1, 1\n");
    let runs = Run::load_csv(file.path()).unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].global, [1024, 1, 1]);
    assert_eq!(runs[1].local, [256, 1, 1]);
}

#[test]
fn run_csv_rejects_malformed_rows() {
    let file = write_temp("1024,1,1,128,1\n");
    assert!(Run::load_csv(file.path()).is_err());

    let file = write_temp("1024,1,1,abc,1,1\n");
    assert!(Run::load_csv(file.path()).is_err());
}

#[test]
fn kernel_config_loads_from_file() {
    let file = write_temp(
        r#"{
            "name": "spmv",
            "source": "@compute fn spmv() {}",
            "properties": {"arrayType": "ragged_array", "chunkSize": "16"},
            "outputArg": {"variable": "out", "addressSpace": "global", "size": "v_MHeight_2 * 4"}
        }"#,
    );
    let cfg = KernelConfig::from_file(file.path()).unwrap();
    assert_eq!(cfg.name, "spmv");
    assert!(cfg.properties.is_ragged());
    assert_eq!(cfg.properties.chunk_size, 16);
}

#[test]
fn invalid_kernel_config_reports_the_path() {
    let file = write_temp("{ not json");
    let err = KernelConfig::from_file(file.path()).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("Failed to load"), "got: {msg}");
}
