//! Integration tests - builds DFP archives in memory and reads them back

use cvmdfp::{CvmError, DfpItrFile, FiscalYear, ReadOptions, Scope, StatementKind};
use rust_decimal::Decimal;
use std::io::{Cursor, Write};
use zip::write::FileOptions;

const HEAD_COLUMNS: &str = "CNPJ_CIA;DT_REFER;VERSAO;DENOM_CIA;CD_CVM;CATEG_DOC;ID_DOC;DT_RECEB;LINK_DOC";
const BP_COLUMNS: &str = "CNPJ_CIA;DT_REFER;VERSAO;DENOM_CIA;CD_CVM;GRUPO_DFP;MOEDA;ESCALA_MOEDA;ORDEM_EXERC;DT_FIM_EXERC;CD_CONTA;DS_CONTA;VL_CONTA;ST_CONTA_FIXA";
const DRE_COLUMNS: &str = "CNPJ_CIA;DT_REFER;VERSAO;DENOM_CIA;CD_CVM;GRUPO_DFP;MOEDA;ESCALA_MOEDA;ORDEM_EXERC;DT_INI_EXERC;DT_FIM_EXERC;CD_CONTA;DS_CONTA;VL_CONTA;ST_CONTA_FIXA";

const ACME: &str = "00.000.000/0001-91;2023-12-31;1;ACME ENERGIA S.A.;12345";
const BETA: &str = "11.222.333/0001-81;2023-12-31;1;SÃO GERALDO S.A.;54321";

fn bpa(prefix: &str, order: &str, end: &str, code: &str, desc: &str, value: &str) -> String {
    format!(
        "{};DF Individual - Balanço Patrimonial Ativo;REAL;MIL;{};{};{};{};{};S",
        prefix, order, end, code, desc, value
    )
}

fn build_archive(members: &[(&str, &str)]) -> Cursor<Vec<u8>> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));

    for (name, content) in members {
        writer.start_file(*name, FileOptions::default()).unwrap();
        let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode(content);
        writer.write_all(&bytes).unwrap();
    }

    writer.finish().unwrap()
}

fn basic_archive() -> Cursor<Vec<u8>> {
    let head = format!("{}\n{};DFP;98765;2024-03-30;http://example.com/doc\n", HEAD_COLUMNS, ACME);

    let bpa_rows = [
        bpa(ACME, "ÚLTIMO", "2023-12-31", "1", "Ativo Total", "1000"),
        bpa(ACME, "ÚLTIMO", "2023-12-31", "1.01", "Ativo Circulante", "600"),
        bpa(ACME, "ÚLTIMO", "2023-12-31", "1.02", "Ativo Não Circulante", "400"),
        bpa(ACME, "PENÚLTIMO", "2022-12-31", "1", "Ativo Total", "900"),
    ];
    let bpa_member = format!("{}\n{}\n", BP_COLUMNS, bpa_rows.join("\n"));

    build_archive(&[
        ("dfp_cia_aberta_2023.csv", head.as_str()),
        ("dfp_cia_aberta_BPA_ind_2023.csv", bpa_member.as_str()),
    ])
}

#[test]
fn test_read_basic_archive() {
    let docs: Vec<_> = DfpItrFile::new(basic_archive())
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(docs.len(), 2);

    let current = &docs[0];
    assert_eq!(current.company_name, "ACME ENERGIA S.A.");
    assert_eq!(current.cnpj.to_string(), "00.000.000/0001-91");
    assert_eq!(current.cvm_code, 12345);
    assert_eq!(current.id, 98765);
    assert_eq!(current.fiscal_year, FiscalYear::Current);
    assert_eq!(current.period_end.to_string(), "2023-12-31");
    assert_eq!(current.receipt_date.to_string(), "2024-03-30");
    assert!(!current.is_partial());

    let tree = current
        .tree(Scope::Individual, StatementKind::BalanceSheetAssets)
        .unwrap();
    assert_eq!(tree.len(), 3);

    let root = &tree.roots[0];
    assert_eq!(root.code.to_string(), "1");
    assert_eq!(root.value, Decimal::from(1000));
    assert_eq!(root.description, "Ativo Total");
    assert_eq!(root.children[0].code.to_string(), "1.01");
    assert_eq!(root.children[0].value, Decimal::from(600));
    assert_eq!(root.children[1].code.to_string(), "1.02");
    assert_eq!(root.children[1].value, Decimal::from(400));

    let prior = &docs[1];
    assert_eq!(prior.fiscal_year, FiscalYear::Prior);
    assert_eq!(prior.period_end.to_string(), "2022-12-31");
    let prior_tree = prior
        .tree(Scope::Individual, StatementKind::BalanceSheetAssets)
        .unwrap();
    assert_eq!(prior_tree.roots[0].value, Decimal::from(900));
}

#[test]
fn test_two_companies_stay_in_sync() {
    let head = format!(
        "{}\n{};DFP;111;2024-03-30;http://example.com/1\n{};DFP;222;2024-03-28;http://example.com/2\n",
        HEAD_COLUMNS, ACME, BETA
    );

    let bpa_rows = [
        bpa(ACME, "ÚLTIMO", "2023-12-31", "1", "Ativo Total", "1000"),
        bpa(BETA, "ÚLTIMO", "2023-12-31", "1", "Ativo Total", "5000"),
        bpa(BETA, "ÚLTIMO", "2023-12-31", "1.01", "Ativo Circulante", "2500"),
    ];
    let bpa_member = format!("{}\n{}\n", BP_COLUMNS, bpa_rows.join("\n"));

    let archive = build_archive(&[
        ("dfp_cia_aberta_2023.csv", head.as_str()),
        ("dfp_cia_aberta_BPA_ind_2023.csv", bpa_member.as_str()),
    ]);

    let docs: Vec<_> = DfpItrFile::new(archive)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].company_name, "ACME ENERGIA S.A.");
    assert_eq!(docs[0].id, 111);

    // The Latin-1 encoded company name must survive transcoding.
    assert_eq!(docs[1].company_name, "SÃO GERALDO S.A.");
    assert_eq!(docs[1].id, 222);

    let beta_tree = docs[1]
        .tree(Scope::Individual, StatementKind::BalanceSheetAssets)
        .unwrap();
    assert_eq!(beta_tree.len(), 2);
    assert_eq!(beta_tree.roots[0].value, Decimal::from(5000));
}

#[test]
fn test_consolidated_filter() {
    let head = format!("{}\n{};DFP;1;2024-03-30;http://example.com\n", HEAD_COLUMNS, ACME);

    let bpa_member = format!(
        "{}\n{}\n",
        BP_COLUMNS,
        bpa(ACME, "ÚLTIMO", "2023-12-31", "1", "Ativo Total", "1000")
    );
    let dre_member = format!(
        "{}\n{};DF Consolidado - Demonstração do Resultado;REAL;MIL;ÚLTIMO;2023-01-01;2023-12-31;3.01;Receita;700;S\n",
        DRE_COLUMNS, ACME
    );

    let members = [
        ("dfp_cia_aberta_2023.csv", head.as_str()),
        ("dfp_cia_aberta_BPA_ind_2023.csv", bpa_member.as_str()),
        ("dfp_cia_aberta_DRE_con_2023.csv", dre_member.as_str()),
    ];

    // Both scopes by default.
    let docs: Vec<_> = DfpItrFile::new(build_archive(&members))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert!(docs[0]
        .tree(Scope::Consolidated, StatementKind::IncomeStatement)
        .is_some());

    // Consolidated members are not even opened when filtered out.
    let docs: Vec<_> = DfpItrFile::with_options(
        build_archive(&members),
        ReadOptions::new().consolidated(false),
    )
    .unwrap()
    .collect::<Result<_, _>>()
    .unwrap();

    assert!(docs[0]
        .tree(Scope::Consolidated, StatementKind::IncomeStatement)
        .is_none());
    assert!(docs[0]
        .tree(Scope::Individual, StatementKind::BalanceSheetAssets)
        .is_some());
}

#[test]
fn test_unknown_members_are_skipped() {
    let head = format!("{}\n{};DFP;1;2024-03-30;http://example.com\n", HEAD_COLUMNS, ACME);
    let bpa_member = format!(
        "{}\n{}\n",
        BP_COLUMNS,
        bpa(ACME, "ÚLTIMO", "2023-12-31", "1", "Ativo Total", "1000")
    );

    let archive = build_archive(&[
        ("leiame.txt", "arquivo informativo"),
        ("fca_cia_aberta_2023.csv", "CNPJ_CIA\n191\n"),
        ("dfp_cia_aberta_2023.csv", head.as_str()),
        ("dfp_cia_aberta_BPA_ind_2023.csv", bpa_member.as_str()),
    ]);

    let docs: Vec<_> = DfpItrFile::new(archive)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(docs.len(), 1);
}

#[test]
fn test_missing_head_member_is_fatal() {
    let bpa_member = format!(
        "{}\n{}\n",
        BP_COLUMNS,
        bpa(ACME, "ÚLTIMO", "2023-12-31", "1", "Ativo Total", "1000")
    );
    let archive = build_archive(&[("dfp_cia_aberta_BPA_ind_2023.csv", bpa_member.as_str())]);

    assert!(matches!(
        DfpItrFile::new(archive).err(),
        Some(CvmError::MissingMember(_))
    ));
}

#[test]
fn test_corrupt_container_is_fatal() {
    let garbage = Cursor::new(b"definitely not a zip file".to_vec());
    assert!(matches!(DfpItrFile::new(garbage).err(), Some(CvmError::Zip(_))));
}

#[test]
fn test_row_faults_ride_on_the_document() {
    let head = format!("{}\n{};DFP;1;2024-03-30;http://example.com\n", HEAD_COLUMNS, ACME);

    let bpa_rows = [
        bpa(ACME, "ÚLTIMO", "2023-12-31", "1", "Ativo Total", "1000"),
        bpa(ACME, "ÚLTIMO", "2023-12-31", "1.01", "Ativo Circulante", "abc"),
        bpa(ACME, "ÚLTIMO", "2023-12-31", "2.01.01", "Órfã", "50"),
    ];
    let bpa_member = format!("{}\n{}\n", BP_COLUMNS, bpa_rows.join("\n"));

    let archive = build_archive(&[
        ("dfp_cia_aberta_2023.csv", head.as_str()),
        ("dfp_cia_aberta_BPA_ind_2023.csv", bpa_member.as_str()),
    ]);

    let docs: Vec<_> = DfpItrFile::new(archive)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(docs.len(), 1);
    let doc = &docs[0];

    assert!(doc.is_partial());
    assert_eq!(doc.faults.len(), 2);
    assert!(doc
        .faults
        .iter()
        .any(|f| matches!(f.error, CvmError::InvalidValue { field: "VL_CONTA", .. })));
    assert!(doc
        .faults
        .iter()
        .any(|f| matches!(f.error, CvmError::OrphanAccount(_))));

    // The offending raw row is preserved for inspection.
    let bad_value = doc
        .faults
        .iter()
        .find(|f| matches!(f.error, CvmError::InvalidValue { .. }))
        .unwrap();
    assert_eq!(bad_value.row.value, "abc");

    // The healthy rows still assembled.
    let tree = doc
        .tree(Scope::Individual, StatementKind::BalanceSheetAssets)
        .unwrap();
    assert!(tree.partial);
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.roots[0].value, Decimal::from(1000));
}

#[test]
fn test_reading_twice_is_idempotent() {
    let collect_shapes = || -> Vec<(String, FiscalYear, Vec<(String, Decimal)>)> {
        DfpItrFile::new(basic_archive())
            .unwrap()
            .map(|r| r.unwrap())
            .map(|doc| {
                let trees = doc
                    .statements
                    .iter()
                    .flat_map(|t| t.flatten())
                    .map(|(c, v)| (c.to_string(), v))
                    .collect();
                (doc.company_name.clone(), doc.fiscal_year, trees)
            })
            .collect()
    };

    assert_eq!(collect_shapes(), collect_shapes());
}

#[test]
fn test_open_from_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dfp_cia_aberta_2023.zip");
    std::fs::write(&path, basic_archive().into_inner()).unwrap();

    let docs = cvmdfp::read_documents(&path).unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].company_name, "ACME ENERGIA S.A.");
}
