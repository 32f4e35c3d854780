use std::{
    cell::RefCell,
    io::{BufReader, Read, Write},
    rc::Rc,
};

use super::ppm::{Adaptive, Frozen, PpmEncoder, PpmModel, UpdatePolicy};
use crate::config::PpmConfig;
use crate::entropy_coding::BitCounter;
use crate::error::{Error, Result};

/// Cloneable handle to one pre-trained model.
///
/// Clones share the same statistics. The handle is single threaded (not
/// `Send`), and only one operation can hold the model at a time: a nested
/// call from inside `with_model` fails with `Error::ModelBusy`.
#[derive(Debug, Clone)]
pub struct SharedModel(Rc<RefCell<PpmModel>>);

impl SharedModel {
    pub fn new(config: PpmConfig) -> Result<Self> {
        Ok(Self::from_model(PpmModel::new(config)?))
    }

    pub fn from_model(model: PpmModel) -> Self {
        Self(Rc::new(RefCell::new(model)))
    }

    pub fn load<R: Read>(reader: R) -> Result<Self> {
        Ok(Self::from_model(PpmModel::load(reader)?))
    }

    pub fn dump<W: Write>(&self, writer: W) -> Result<()> {
        self.with_model(|model| model.dump(writer))?
    }

    /// Trains on the whole stream (terminated by EOF), continuing from the
    /// current context. Returns the bits it would have taken to code it.
    pub fn train<R: Read>(&self, reader: R) -> Result<u64> {
        self.count_bits::<Adaptive, _>(reader)
    }

    /// Bits needed to code the stream from an empty context, leaving the
    /// statistics untouched
    pub fn predict<R: Read>(&self, reader: R) -> Result<u64> {
        self.with_model_mut(PpmModel::reset_context)?;
        self.count_bits::<Frozen, _>(reader)
    }

    pub fn with_model<T>(&self, f: impl FnOnce(&PpmModel) -> T) -> Result<T> {
        let model = self.0.try_borrow().map_err(|_| Error::ModelBusy)?;
        Ok(f(&*model))
    }

    pub fn with_model_mut<T>(&self, f: impl FnOnce(&mut PpmModel) -> T) -> Result<T> {
        let mut model = self.0.try_borrow_mut().map_err(|_| Error::ModelBusy)?;
        Ok(f(&mut *model))
    }

    /// Handles pointing at this model
    pub fn handles(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    fn count_bits<U: UpdatePolicy, R: Read>(&self, reader: R) -> Result<u64> {
        let mut model = self.0.try_borrow_mut().map_err(|_| Error::ModelBusy)?;
        let mut encoder = PpmEncoder::<_, U>::with_policy(&mut *model, BitCounter::new());
        for byte in BufReader::new(reader).bytes() {
            encoder.encode(byte?)?;
        }
        Ok(encoder.finish()?.bits())
    }
}

#[cfg(test)]
mod tests {
    use super::SharedModel;
    use crate::config::PpmConfig;
    use crate::Error;

    const TEXT: &[u8] = b"It was the best of times, it was the worst of times, it was the age of wisdom";

    fn shared() -> SharedModel {
        SharedModel::new(PpmConfig::with_order(4)).unwrap()
    }

    #[test]
    fn training_makes_prediction_cheaper() {
        let model = shared();
        let untrained = model.predict(TEXT).unwrap();
        let first = model.train(TEXT).unwrap();
        let trained = model.predict(TEXT).unwrap();

        assert!(first < untrained, "repeats are cheaper while learning");
        assert!(trained * 2 < untrained, "{trained} vs {untrained}");
    }

    #[test]
    fn predict_is_repeatable() {
        let model = shared();
        model.train(TEXT).unwrap();
        let nodes = model.with_model(|m| m.node_count()).unwrap();

        let a = model.predict(&b"it was the age"[..]).unwrap();
        let b = model.predict(&b"it was the age"[..]).unwrap();
        assert_eq!(a, b);
        assert_eq!(model.with_model(|m| m.node_count()).unwrap(), nodes);
    }

    #[test]
    fn clones_share_statistics() {
        let model = shared();
        let other = model.clone();
        assert_eq!(model.handles(), 2);

        other.train(TEXT).unwrap();
        let seen_by_first = model.with_model(|m| m.node_count()).unwrap();
        assert!(seen_by_first > 0);
        assert_eq!(seen_by_first, other.with_model(|m| m.node_count()).unwrap());
    }

    #[test]
    fn nested_use_is_busy() {
        let model = shared();
        let inner = model.with_model(|_| model.train(TEXT)).unwrap();
        assert!(matches!(inner, Err(Error::ModelBusy)));
        // shared reads are fine
        assert!(model.with_model(|_| model.with_model(|m| m.max_order())).unwrap().is_ok());
    }

    #[test]
    fn dump_and_load_through_a_file() {
        let model = shared();
        model.train(TEXT).unwrap();

        let mut file = tempfile::tempfile().unwrap();
        model.dump(&mut file).unwrap();
        std::io::Seek::rewind(&mut file).unwrap();
        let loaded = SharedModel::load(&file).unwrap();

        assert_eq!(loaded.predict(TEXT).unwrap(), model.predict(TEXT).unwrap());
    }
}
