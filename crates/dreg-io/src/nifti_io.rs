//! NIfTI-1 readers and writers.
//!
//! Image geometry comes from the sform when present, then the qform, and
//! finally the pixel dimensions alone. Voxel tensors use the `[z, y, x]`
//! axis order of the rest of the workspace.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use burn::tensor::backend::Backend;
use dreg_core::spatial::{Direction, Point, Spacing};
use dreg_core::{Image, ImageDomain, ImageRegion};
use dreg_registration::base::BoxedImageReader;
use dreg_registration::{ConstructReaderMethod, ImageReader, RegistrationError};
use nalgebra::Matrix4;
use ndarray::{ArrayD, IxDyn, ShapeBuilder};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderStreamedOptions};
use tracing::{debug, info};

/// Homogeneous voxel-to-physical matrix of a header.
fn header_affine(header: &NiftiHeader) -> Matrix4<f64> {
    if header.sform_code > 0 {
        let rows = [header.srow_x, header.srow_y, header.srow_z];
        Matrix4::from_fn(|r, c| if r < 3 { rows[r][c] as f64 } else if c == 3 { 1.0 } else { 0.0 })
    } else if header.qform_code > 0 {
        let b = header.quatern_b as f64;
        let c = header.quatern_c as f64;
        let d = header.quatern_d as f64;
        let a = (1.0 - (b * b + c * c + d * d).min(1.0)).sqrt();
        let qfac = if header.pixdim[0] < 0.0 { -1.0 } else { 1.0 };

        let dx = header.pixdim[1] as f64;
        let dy = header.pixdim[2] as f64;
        let dz = header.pixdim[3] as f64 * qfac;

        Matrix4::new(
            (a * a + b * b - c * c - d * d) * dx,
            (2.0 * b * c - 2.0 * a * d) * dy,
            (2.0 * b * d + 2.0 * a * c) * dz,
            header.quatern_x as f64,
            (2.0 * b * c + 2.0 * a * d) * dx,
            (a * a + c * c - b * b - d * d) * dy,
            (2.0 * c * d - 2.0 * a * b) * dz,
            header.quatern_y as f64,
            (2.0 * b * d - 2.0 * a * c) * dx,
            (2.0 * c * d + 2.0 * a * b) * dy,
            (a * a + d * d - c * c - b * b) * dz,
            header.quatern_z as f64,
            0.0,
            0.0,
            0.0,
            1.0,
        )
    } else {
        let mut affine = Matrix4::identity();
        for k in 0..3 {
            affine[(k, k)] = header.pixdim[k + 1] as f64;
        }
        affine
    }
}

/// Largest possible region and geometry described by a header.
fn header_domain<const D: usize>(header: &NiftiHeader) -> Result<ImageDomain<D>> {
    let ndim = header.dim[0] as usize;
    if ndim > 7 {
        bail!("Invalid NIfTI header: dim[0] = {} exceeds 7", ndim);
    }
    if ndim < D || header.dim[D + 1..=ndim.max(D)].iter().any(|n| *n > 1) {
        bail!("Expected a {}-D NIfTI image, found dimensions {:?}", D, &header.dim[1..=ndim]);
    }
    let size: [usize; D] = std::array::from_fn(|k| header.dim[k + 1] as usize);

    let affine = header_affine(header);
    let mut origin = Point::<D>::origin();
    let mut spacing = Spacing::<D>::uniform(1.0);
    let mut direction = Direction::<D>::identity();
    for c in 0..D {
        origin[c] = affine[(c, 3)];
        let norm = (0..D).map(|r| affine[(r, c)].powi(2)).sum::<f64>().sqrt();
        if norm > 1e-9 {
            spacing[c] = norm;
            for r in 0..D {
                direction[(r, c)] = affine[(r, c)] / norm;
            }
        }
    }
    Ok(ImageDomain::new(origin, spacing, direction, ImageRegion::from_size(size))?)
}

/// Header fields encoding the geometry of `domain` as an sform.
fn domain_header<const D: usize>(domain: &ImageDomain<D>) -> NiftiHeader {
    let mut header = NiftiHeader::default();
    let matrix = domain.index_to_physical_matrix();
    let mut rows = [[0.0f32; 4]; 3];
    for (r, row) in rows.iter_mut().enumerate() {
        if r < D {
            for c in 0..D {
                row[c] = matrix[(r, c)] as f32;
            }
            row[3] = domain.origin()[r] as f32;
        } else {
            row[r] = 1.0;
        }
    }
    header.srow_x = rows[0];
    header.srow_y = rows[1];
    header.srow_z = rows[2];
    header.sform_code = 1;
    header.qform_code = 0;
    for k in 0..D {
        header.pixdim[k + 1] = domain.spacing()[k] as f32;
    }
    header
}

/// Read the geometry of a NIfTI file without loading voxels.
pub fn read_nifti_domain<const D: usize, P: AsRef<Path>>(path: P) -> Result<ImageDomain<D>> {
    let path = path.as_ref();
    let header = NiftiHeader::from_file(path)
        .with_context(|| format!("Failed to read NIfTI header {}", path.display()))?;
    header_domain(&header)
}

/// Stream the slices of a NIfTI volume covering `region` and copy it out.
///
/// Slices have rank `D - 1` and run along the slowest image axis. Slices
/// before the region are skipped without conversion and reading stops after
/// the last one, so only the file prefix up to the region is decoded.
fn load_region<const D: usize>(path: &Path, region: &ImageRegion<D>) -> Result<(ImageDomain<D>, Vec<f32>)> {
    if D < 2 {
        bail!("Streamed NIfTI reads need at least two dimensions");
    }
    let obj = ReaderStreamedOptions::new()
        .read_file_rank(path, (D - 1) as u16)
        .with_context(|| format!("Failed to open NIfTI file {}", path.display()))?;
    let domain = header_domain::<D>(obj.header())?;
    if !domain.region().is_inside(region) {
        bail!("Requested {} is not inside {}", region, domain.region());
    }

    let first = region.index[D - 1] as usize;
    let last = first + region.size[D - 1];
    let slice_pixels = region.number_of_pixels() / region.size[D - 1];
    let mut index = vec![0usize; D - 1];
    let mut voxels = Vec::with_capacity(region.number_of_pixels());
    for (s, slice) in obj.into_volume().enumerate().take(last) {
        let slice = slice.with_context(|| format!("Failed to read slice {} of {}", s, path.display()))?;
        if s < first {
            continue;
        }
        let slice: ArrayD<f32> = slice
            .into_ndarray::<f32>()
            .context("Failed to convert slice to ndarray")?;
        // Slices are indexed [x, y, ...] without the slicing axis.
        for flat in 0..slice_pixels {
            let mut rest = flat;
            for k in 0..D - 1 {
                index[k] = region.index[k] as usize + rest % region.size[k];
                rest /= region.size[k];
            }
            let value = slice
                .get(index.as_slice())
                .ok_or_else(|| anyhow!("Voxel {:?} is outside slice {} {:?}", index, s, slice.shape()))?;
            voxels.push(*value);
        }
    }
    if voxels.len() != region.number_of_pixels() {
        bail!("{} ended before {} was read", path.display(), region);
    }
    debug!("Streamed slices {}..{} of {}", first, last, path.display());
    Ok((domain, voxels))
}

/// Read a whole NIfTI image.
pub fn read_nifti<B: Backend, const D: usize, P: AsRef<Path>>(path: P, device: &B::Device) -> Result<Image<B, D>> {
    let path = path.as_ref();
    let region = *read_nifti_domain::<D, _>(path)?.region();
    let (domain, voxels) = load_region(path, &region)?;
    Ok(Image::from_voxels(voxels, domain, device)?)
}

fn write_voxels<const D: usize>(path: &Path, domain: &ImageDomain<D>, voxels: Vec<f32>) -> Result<()> {
    // Fortran layout: x fastest, matching the flat buffer.
    let array = ArrayD::from_shape_vec(IxDyn(&domain.size()).f(), voxels)
        .context("Voxel buffer does not match the image size")?;
    let header = domain_header(domain);
    WriterOptions::new(path)
        .reference_header(&header)
        .write_nifti(&array)
        .with_context(|| format!("Failed to write NIfTI file {}", path.display()))?;
    Ok(())
}

/// Write an image whose buffer starts at index zero.
///
/// Use [`write_buffered_region`] for blocks cut out of a larger image.
pub fn write_nifti<B: Backend, const D: usize, P: AsRef<Path>>(path: P, image: &Image<B, D>) -> Result<()> {
    let buffered = image.buffered_region();
    if buffered.index.iter().any(|i| *i != 0) {
        bail!("Buffered {} does not start at index zero", buffered);
    }
    write_voxels(path.as_ref(), image.domain(), image.voxels()?)
}

/// Write only the buffered region of `image`.
///
/// The written origin is the physical position of the first buffered voxel,
/// so the file overlays the source image in physical space.
pub fn write_buffered_region<B: Backend, const D: usize, P: AsRef<Path>>(path: P, image: &Image<B, D>) -> Result<()> {
    let buffered = *image.buffered_region();
    let origin = image.domain().index_to_physical(&buffered.index);
    let domain = image
        .domain()
        .with_origin(origin)
        .with_region(ImageRegion::from_size(buffered.size));
    debug!("Writing buffered {} to {}", buffered, path.as_ref().display());
    write_voxels(path.as_ref(), &domain, image.voxels()?)
}

/// Factory for readers of one NIfTI file.
#[derive(Debug, Clone)]
pub struct NiftiReaderFactory<const D: usize> {
    path: PathBuf,
}

impl<const D: usize> NiftiReaderFactory<D> {
    /// Block tasks may run in other working directories, so the path must be
    /// absolute.
    pub fn new<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        if !path.is_absolute() {
            bail!("NIfTI reader requires an absolute path, got {}", path.display());
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a reader. Only the header is read.
    pub fn open(&self) -> Result<NiftiReader<D>> {
        let domain = read_nifti_domain::<D, _>(&self.path)?;
        info!("Opened {} with region {}", self.path.display(), domain.region());
        Ok(NiftiReader {
            path: self.path.clone(),
            domain,
        })
    }
}

impl<B: Backend, const D: usize> ConstructReaderMethod<B, D> for NiftiReaderFactory<D> {
    fn construct(&self) -> dreg_registration::Result<BoxedImageReader<B, D>> {
        let reader = self
            .open()
            .map_err(|e| RegistrationError::reader(format!("{:#}", e)))?;
        Ok(Box::new(reader))
    }
}

/// Reader factory for the NIfTI file at `path`.
pub fn make_reader<const D: usize, P: Into<PathBuf>>(path: P) -> Result<NiftiReaderFactory<D>> {
    NiftiReaderFactory::new(path)
}

/// Unbuffered reader of one NIfTI file.
#[derive(Debug, Clone)]
pub struct NiftiReader<const D: usize> {
    path: PathBuf,
    domain: ImageDomain<D>,
}

impl<B: Backend, const D: usize> ImageReader<B, D> for NiftiReader<D> {
    fn domain(&self) -> &ImageDomain<D> {
        &self.domain
    }

    fn read_region(&self, region: &ImageRegion<D>, device: &B::Device) -> dreg_registration::Result<Image<B, D>> {
        debug!("Streaming {} from {}", region, self.path.display());
        let (domain, voxels) =
            load_region(&self.path, region).map_err(|e| RegistrationError::reader(format!("{:#}", e)))?;
        Ok(Image::from_voxels(voxels, domain.with_region(*region), device)?)
    }
}
