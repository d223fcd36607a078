//! The published experiments the unified table is built from.
//!
//! Each `Paper` is one adapter: it knows how that experiment's raw fields map
//! onto the canonical record. Adding an experiment means adding a variant and
//! its profile here; the normalizer and reconstructor stay untouched.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::normalizer::{ExperimentProfile, FieldSource, FlowSeqLayout, UtrAssembly};
use crate::record::fields;
use crate::utils::IngestError;

const DH10B: &str = "Escherichia coli str. K-12 substr. DH10B";
const MG1655: &str = "Escherichia coli str. K-12 substr. MG1655";
const B_THETA: &str = "Bacteroides thetaiotaomicron VPI-5482";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Paper {
    /// Standby-site translation (Espah Borujeni et al., NAR 2014)
    EspahBorujeniNar2013,
    /// Synthetic riboswitches from RNA aptamers
    EspahBorujeniNar2015,
    /// Ribosome drafting
    EspahBorujeniJacs2016,
    /// Ribosome footprint structures
    EspahBorujeniFootprint,
    /// RBS Calculator
    SalisNatBiotech2009,
    /// Multi-protein systems in diverse bacteria
    FarasatMsb2014,
    /// Translational coupling in operons
    TianNar2015,
    /// Bacteroides thetaiotaomicron parts
    MimeeCellSys2015,
    /// EMOPEC, individually characterized subset
    BondeNatMethodsIc2016,
    /// Promoter x RBS library, flow-seq
    KosuriPnas2013,
    /// N-terminal codon library, flow-seq
    GoodmanScience2013,
}

impl Paper {
    pub const ALL: [Paper; 11] = [
        Paper::EspahBorujeniNar2013,
        Paper::EspahBorujeniNar2015,
        Paper::EspahBorujeniJacs2016,
        Paper::EspahBorujeniFootprint,
        Paper::SalisNatBiotech2009,
        Paper::FarasatMsb2014,
        Paper::TianNar2015,
        Paper::MimeeCellSys2015,
        Paper::BondeNatMethodsIc2016,
        Paper::KosuriPnas2013,
        Paper::GoodmanScience2013,
    ];

    /// Identifier used in the PAPER column
    pub fn id(&self) -> &'static str {
        match self {
            Paper::EspahBorujeniNar2013 => "EspahBorujeni_NAR_2013",
            Paper::EspahBorujeniNar2015 => "EspahBorujeni_NAR_2015",
            Paper::EspahBorujeniJacs2016 => "EspahBorujeni_JACS_2016",
            Paper::EspahBorujeniFootprint => "EspahBorujeni_Footprint",
            Paper::SalisNatBiotech2009 => "Salis_Nat_Biotech_2009",
            Paper::FarasatMsb2014 => "Farasat_MSB_2014",
            Paper::TianNar2015 => "Tian_NAR_2015",
            Paper::MimeeCellSys2015 => "Mimee_Cell_Sys_2015",
            Paper::BondeNatMethodsIc2016 => "Bonde_NatMethods_IC_2016",
            Paper::KosuriPnas2013 => "Kosuri_PNAS_2013",
            Paper::GoodmanScience2013 => "Goodman_Science_2013",
        }
    }

    pub fn profile(&self) -> ExperimentProfile {
        match self {
            Paper::EspahBorujeniNar2013
            | Paper::EspahBorujeniJacs2016
            | Paper::EspahBorujeniFootprint
            | Paper::SalisNatBiotech2009 => self.characterized(FieldSource::constant("RFP"), DH10B),
            Paper::EspahBorujeniNar2015 => ExperimentProfile {
                utr: UtrAssembly::Concat(vec![
                    "PRE.APTAMER".to_string(),
                    "APTAMER".to_string(),
                    "POST.APTAMER".to_string(),
                ]),
                ..self.characterized(FieldSource::column(fields::PROTEIN), DH10B)
            },
            Paper::FarasatMsb2014 => ExperimentProfile {
                organism: FieldSource::column(fields::ORGANISM),
                utr: UtrAssembly::Concat(vec!["PRESEQ".to_string(), "RBS".to_string()]),
                ..self.characterized(FieldSource::column(fields::PROTEIN), "")
            },
            Paper::TianNar2015 => ExperimentProfile {
                organism: FieldSource::column(fields::ORGANISM),
                ..self.characterized(FieldSource::column(fields::PROTEIN), "")
            },
            Paper::MimeeCellSys2015 => self.characterized(FieldSource::constant("NanoLuc"), B_THETA),
            Paper::BondeNatMethodsIc2016 => ExperimentProfile {
                prot_std: None,
                ..self.characterized(FieldSource::constant("sfGFP"), MG1655)
            },
            Paper::KosuriPnas2013 => self.flow_seq(vec!["RBS".to_string()], "", "BIN"),
            Paper::GoodmanScience2013 => self.flow_seq(
                vec!["RBS".to_string(), "N.TERMINAL.CDS".to_string()],
                "CAT",
                "bin",
            ),
        }
    }

    fn characterized(&self, protein: FieldSource, organism: &str) -> ExperimentProfile {
        ExperimentProfile {
            paper: self.id().to_string(),
            protein,
            organism: FieldSource::constant(organism),
            temp: 37.0,
            utr: UtrAssembly::Direct,
            cds: fields::CDS.to_string(),
            prot_mean: Some(fields::PROT_MEAN.to_string()),
            prot_std: Some(fields::PROT_STD.to_string()),
            flow_seq: None,
        }
    }

    fn flow_seq(&self, tail: Vec<String>, suffix: &str, bin_prefix: &str) -> ExperimentProfile {
        ExperimentProfile {
            paper: self.id().to_string(),
            protein: FieldSource::constant("sfGFP"),
            organism: FieldSource::constant(MG1655),
            temp: 30.0,
            utr: UtrAssembly::TranscribedLeader {
                promoter: "PROMOTER".to_string(),
                tss: "TSS".to_string(),
                tail,
                suffix: suffix.to_string(),
            },
            cds: fields::CDS.to_string(),
            prot_mean: None,
            prot_std: None,
            flow_seq: Some(FlowSeqLayout {
                bins: (1..=12).map(|i| format!("{}{}", bin_prefix, i)).collect(),
            }),
        }
    }
}

impl fmt::Display for Paper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Paper {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Paper::ALL
            .iter()
            .copied()
            .find(|p| p.id() == s)
            .ok_or_else(|| IngestError::ConfigError(format!("unknown paper '{}'", s)))
    }
}

impl TryFrom<String> for Paper {
    type Error = IngestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Paper> for String {
    fn from(paper: Paper) -> Self {
        paper.id().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Method;

    #[test]
    fn test_ids_round_trip() {
        for paper in Paper::ALL {
            assert_eq!(paper.id().parse::<Paper>().unwrap(), paper);
            assert_eq!(paper.profile().paper, paper.id());
        }
    }

    #[test]
    fn test_unknown_paper() {
        let err = "Nobody_2099".parse::<Paper>().unwrap_err();
        assert_eq!(err.to_string(), "ConfigError: unknown paper 'Nobody_2099'");
    }

    #[test]
    fn test_methods() {
        let flow_seq: Vec<Paper> = Paper::ALL
            .into_iter()
            .filter(|p| p.profile().method() == Method::FlowSeq)
            .collect();
        assert_eq!(flow_seq, vec![Paper::KosuriPnas2013, Paper::GoodmanScience2013]);
    }

    #[test]
    fn test_flow_seq_profiles() {
        let kosuri = Paper::KosuriPnas2013.profile();
        assert_eq!(kosuri.temp, 30.0);
        let bins = &kosuri.flow_seq.as_ref().unwrap().bins;
        assert_eq!(bins.len(), 12);
        assert_eq!(bins[0], "BIN1");

        let goodman = Paper::GoodmanScience2013.profile();
        assert_eq!(goodman.flow_seq.unwrap().bins[11], "bin12");
        match goodman.utr {
            UtrAssembly::TranscribedLeader { tail, suffix, .. } => {
                assert_eq!(tail, vec!["RBS", "N.TERMINAL.CDS"]);
                assert_eq!(suffix, "CAT");
            }
            other => panic!("unexpected assembly {:?}", other),
        }
    }

    #[test]
    fn test_characterized_profiles() {
        let bonde = Paper::BondeNatMethodsIc2016.profile();
        assert_eq!(bonde.prot_std, None);
        assert_eq!(bonde.protein, FieldSource::constant("sfGFP"));

        let farasat = Paper::FarasatMsb2014.profile();
        assert_eq!(farasat.organism, FieldSource::column(fields::ORGANISM));
        assert_eq!(
            farasat.utr,
            UtrAssembly::Concat(vec!["PRESEQ".to_string(), "RBS".to_string()])
        );

        let mimee = Paper::MimeeCellSys2015.profile();
        assert_eq!(mimee.organism, FieldSource::constant(B_THETA));
    }

    #[test]
    fn test_serde_as_identifier() {
        let json = serde_json::to_string(&Paper::TianNar2015).unwrap();
        assert_eq!(json, "\"Tian_NAR_2015\"");
        let back: Paper = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Paper::TianNar2015);
    }
}
