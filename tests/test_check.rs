use record_file_sort::error::MalformedRecordError;
use record_file_sort::generator::{DataFileGenerator, Generate};
use record_file_sort::sort::Sort;

mod common;

#[test]
fn test_check_sorted() -> Result<(), anyhow::Error> {
    let dir = common::setup();
    let path = dir.join("sorted.dat");
    common::write_lines(path.clone(), &["1. Amy", "1. amy", "2. amy", "-5. bob", "5. bob", "3. cam"])?;

    let sort = Sort::new(common::config(&dir));
    assert!(sort.check(&path)?);
    common::teardown(dir);
    Ok(())
}

#[test]
fn test_check_not_sorted() -> Result<(), anyhow::Error> {
    let dir = common::setup();
    let config = common::config(&dir).with_test_file_rows_generation_count(1000);
    let random_path = DataFileGenerator::new(config.clone()).with_seed(17).generate()?;

    let sort = Sort::new(config);
    assert!(!sort.check(&random_path)?);
    common::teardown(dir);
    Ok(())
}

#[test]
fn test_check_malformed() -> Result<(), anyhow::Error> {
    let dir = common::setup();
    let path = dir.join("sorted.dat");
    common::write_lines(path.clone(), &["1. amy", "amy"])?;

    let sort = Sort::new(common::config(&dir));
    let e = sort.check(&path).unwrap_err();
    assert!(e.downcast_ref::<MalformedRecordError>().is_some());
    common::teardown(dir);
    Ok(())
}
