pub(crate) mod plec;
