//! Reconstruction of expression levels from flow-sorted sequencing counts.
//!
//! RNA abundance comes from the RNA/DNA read ratio of two replicate
//! libraries. Protein level is the weighted geometric mean of the bin
//! fluorescences, each bin weighted by its share of the sequence's sorted
//! reads. All arithmetic runs column-wise over one experiment; rows never
//! depend on each other.
//!
//! Division by zero and logarithms of zero are not guarded. They yield NaN
//! (or infinite) values that flow into every derived field of the row so a
//! consumer can filter the row afterwards.

use ndarray::{Array1, Array2, Zip};
use tracing::debug;

use crate::calibration::CalibrationTable;
use crate::columns::RawColumns;
use crate::normalizer::FlowSeqLayout;
use crate::record::{FlowSeqEstimate, SequenceRecord};
use crate::utils::{weighted_log, IngestError};

pub const COUNT_PROTEIN: &str = "COUNT.PROTEIN";
pub const COUNT_A_RNA: &str = "COUNT.A.RNA";
pub const COUNT_B_RNA: &str = "COUNT.B.RNA";
pub const COUNT_A_DNA: &str = "COUNT.A.DNA";
pub const COUNT_B_DNA: &str = "COUNT.B.DNA";

/// Raw count columns every flow-seq experiment must provide
pub const COUNT_COLUMNS: [&str; 5] = [
    COUNT_PROTEIN,
    COUNT_A_RNA,
    COUNT_B_RNA,
    COUNT_A_DNA,
    COUNT_B_DNA,
];

/// Per-sequence read counts of one flow-seq experiment
#[derive(Debug, Clone)]
pub struct FlowSeqCounts {
    /// Total protein-sorted reads of each sequence
    pub protein_total: Array1<f64>,
    pub rna_a: Array1<f64>,
    pub rna_b: Array1<f64>,
    pub dna_a: Array1<f64>,
    pub dna_b: Array1<f64>,
    /// Reads per bin, keyed by bin id
    pub bins: Vec<(String, Array1<f64>)>,
}

impl FlowSeqCounts {
    /// Pull the count columns named by `layout` out of the raw columns
    pub fn from_columns(raw: &RawColumns, layout: &FlowSeqLayout) -> Result<Self, IngestError> {
        raw.row_count()?;
        let column = |name: &str| -> Result<Array1<f64>, IngestError> {
            Ok(Array1::from(raw.numeric(name)?.into_owned()))
        };

        let bins = layout
            .bins
            .iter()
            .map(|id| -> Result<(String, Array1<f64>), IngestError> {
                Ok((id.clone(), column(id)?))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            protein_total: column(COUNT_PROTEIN)?,
            rna_a: column(COUNT_A_RNA)?,
            rna_b: column(COUNT_B_RNA)?,
            dna_a: column(COUNT_A_DNA)?,
            dna_b: column(COUNT_B_DNA)?,
            bins,
        })
    }

    pub fn len(&self) -> usize {
        self.protein_total.len()
    }

    pub fn is_empty(&self) -> bool {
        self.protein_total.is_empty()
    }

    /// Every count array must have one entry per sequence
    pub fn validate(&self) -> Result<(), IngestError> {
        let replicates = [
            (COUNT_A_RNA, &self.rna_a),
            (COUNT_B_RNA, &self.rna_b),
            (COUNT_A_DNA, &self.dna_a),
            (COUNT_B_DNA, &self.dna_b),
        ];
        let bins = self.bins.iter().map(|(id, c)| (id.as_str(), c));
        for (name, counts) in replicates.into_iter().chain(bins) {
            if counts.len() != self.len() {
                return Err(IngestError::SchemaMismatch(format!(
                    "count column '{}' has {} entries for {} sequences",
                    name,
                    counts.len(),
                    self.len()
                )));
            }
        }
        Ok(())
    }
}

/// Replicate RNA ratios and their combination
#[derive(Debug, Clone)]
pub struct RnaEstimate {
    pub replicate_a: Array1<f64>,
    pub replicate_b: Array1<f64>,
    pub mean: Array1<f64>,
    /// Two-sample population variance (divides by 2, not 1)
    pub var: Array1<f64>,
}

/// Normalized RNA/DNA ratio of each replicate, their mean and spread
pub fn estimate_rna(
    counts: &FlowSeqCounts,
    calibration: &CalibrationTable,
) -> Result<RnaEstimate, IngestError> {
    counts.validate()?;
    let replicate_a = (&counts.rna_a / calibration.total_rna_a)
        / (&counts.dna_a / calibration.total_dna_a);
    let replicate_b = (&counts.rna_b / calibration.total_rna_b)
        / (&counts.dna_b / calibration.total_dna_b);

    let mean = (&replicate_a + &replicate_b) / 2.0;
    let var = ((&replicate_a - &mean).mapv(|d| d * d) + (&replicate_b - &mean).mapv(|d| d * d))
        / 2.0;

    Ok(RnaEstimate {
        replicate_a,
        replicate_b,
        mean,
        var,
    })
}

/// Fractional contribution of each bin to each sequence's sorted signal
///
/// # Returns
/// * `Ok(weights)` - `rows x bins` matrix, columns in count order; each row
///   sums to 1 unless it is undefined
/// * `Err(IngestError::CalibrationKeyMissing)` - A counted bin is not calibrated
/// * `Err(IngestError::SchemaMismatch)` - A calibrated bin has no count column
pub fn bin_weights(
    counts: &FlowSeqCounts,
    calibration: &CalibrationTable,
) -> Result<Array2<f64>, IngestError> {
    check_bins(counts, calibration)?;

    let n = counts.len();
    let mut contributions = Vec::with_capacity(counts.bins.len());
    let mut denominator = Array1::<f64>::zeros(n);
    for (id, bin_counts) in &counts.bins {
        let cell_fraction = calibration.bin(id)?.cell_fraction;
        let contribution = (bin_counts / &counts.protein_total) * cell_fraction;
        denominator += &contribution;
        contributions.push(contribution);
    }

    let mut weights = Array2::<f64>::zeros((n, counts.bins.len()));
    for (j, contribution) in contributions.iter().enumerate() {
        weights.column_mut(j).assign(&(contribution / &denominator));
    }
    Ok(weights)
}

fn check_bins(counts: &FlowSeqCounts, calibration: &CalibrationTable) -> Result<(), IngestError> {
    for (id, _) in &counts.bins {
        calibration.bin(id)?;
    }
    counts.validate()?;
    for id in calibration.bin_ids() {
        if !counts.bins.iter().any(|(counted, _)| counted == id) {
            return Err(IngestError::SchemaMismatch(format!(
                "calibrated bin '{}' of paper '{}' has no count column",
                id, calibration.paper
            )));
        }
    }
    Ok(())
}

/// Reconstructed protein level of each sequence
#[derive(Debug, Clone)]
pub struct ProteinEstimate {
    pub weights: Array2<f64>,
    /// Weighted geometric mean of the bin fluorescences
    pub mean: Array1<f64>,
    /// Weighted spread of the bin fluorescences, centered on `mean`
    pub var: Array1<f64>,
}

pub fn estimate_protein(
    counts: &FlowSeqCounts,
    calibration: &CalibrationTable,
) -> Result<ProteinEstimate, IngestError> {
    let weights = bin_weights(counts, calibration)?;
    let n = counts.len();

    let mut mean = Array1::<f64>::ones(n);
    for (j, (id, _)) in counts.bins.iter().enumerate() {
        let fluo = calibration.bin(id)?.fluo;
        Zip::from(&mut mean)
            .and(weights.column(j))
            .for_each(|m, &a| *m *= weighted_log(a, fluo).exp());
    }

    let mut var = Array1::<f64>::zeros(n);
    for (j, (id, _)) in counts.bins.iter().enumerate() {
        let fluo = calibration.bin(id)?.fluo;
        Zip::from(&mut var)
            .and(weights.column(j))
            .and(&mean)
            .for_each(|v, &a, &m| *v += a * (fluo - m).powi(2));
    }

    Ok(ProteinEstimate { weights, mean, var })
}

/// Approximate variance of `mu1 / mu2`, taking the covariance as zero
///
/// Computes `(mu2² · var1² + mu1² · var2²) / mu2²`. The component variances
/// enter squared.
pub fn approx_var_ratio(
    mu1: &Array1<f64>,
    var1: &Array1<f64>,
    mu2: &Array1<f64>,
    var2: &Array1<f64>,
) -> Array1<f64> {
    Zip::from(mu1)
        .and(var1)
        .and(mu2)
        .and(var2)
        .map_collect(|&m1, &v1, &m2, &v2| {
            (m2.powi(2) * v1.powi(2) + m1.powi(2) * v2.powi(2)) / m2.powi(2)
        })
}

/// Full reconstruction of one flow-seq experiment
#[derive(Debug, Clone)]
pub struct Reconstruction {
    pub rna: RnaEstimate,
    pub protein: ProteinEstimate,
    pub transl_rate: Array1<f64>,
    pub transl_rate_var: Array1<f64>,
}

impl Reconstruction {
    pub fn len(&self) -> usize {
        self.transl_rate.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transl_rate.is_empty()
    }

    pub fn estimate(&self, row: usize) -> FlowSeqEstimate {
        FlowSeqEstimate {
            rna_a: self.rna.replicate_a[row],
            rna_b: self.rna.replicate_b[row],
            rna: self.rna.mean[row],
            rna_var: self.rna.var[row],
            prot_var: self.protein.var[row],
            transl_rate: self.transl_rate[row],
            transl_rate_var: self.transl_rate_var[row],
        }
    }

    /// Rows whose translation rate or its variance is not a finite number
    pub fn undefined_rows(&self) -> usize {
        Zip::from(&self.transl_rate)
            .and(&self.transl_rate_var)
            .fold(0, |acc, &r, &v| acc + usize::from(!(r.is_finite() && v.is_finite())))
    }
}

pub fn reconstruct(
    counts: &FlowSeqCounts,
    calibration: &CalibrationTable,
) -> Result<Reconstruction, IngestError> {
    let rna = estimate_rna(counts, calibration)?;
    let protein = estimate_protein(counts, calibration)?;

    let transl_rate = &protein.mean / &rna.mean;
    let transl_rate_var = approx_var_ratio(&protein.mean, &protein.var, &rna.mean, &rna.var);

    let reconstruction = Reconstruction {
        rna,
        protein,
        transl_rate,
        transl_rate_var,
    };
    debug!(
        paper = %calibration.paper,
        rows = reconstruction.len(),
        undefined = reconstruction.undefined_rows(),
        "flow-seq reconstruction done"
    );
    Ok(reconstruction)
}

/// Write reconstructed estimates into already-normalized records
///
/// PROT.MEAN and PROT.STD of each record are replaced by the reconstructed
/// protein level and its spread.
pub fn apply_reconstruction(
    records: &mut [SequenceRecord],
    reconstruction: &Reconstruction,
) -> Result<(), IngestError> {
    if records.len() != reconstruction.len() {
        return Err(IngestError::SchemaMismatch(format!(
            "{} records but {} reconstructed rows",
            records.len(),
            reconstruction.len()
        )));
    }
    for (i, record) in records.iter_mut().enumerate() {
        let estimate = reconstruction.estimate(i);
        record.prot_mean = Some(reconstruction.protein.mean[i]);
        record.prot_std = Some(estimate.prot_std());
        record.flow_seq = Some(estimate);
    }
    Ok(())
}
