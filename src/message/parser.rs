use crate::error::{Error, Result};

use super::header::{Header, HeaderInternal};
use super::name::Name;
use super::packer::*;
use super::question::Question;
use super::resource::Resource;
use super::{CLASS_MASK, CLASS_UNICAST_RESPONSE, DnsClass, DnsType};

#[derive(Copy, Clone)]
enum Sec {
    Answers,
    Authorities,
    Additionals,
}

// A Parser walks a DNS message in wire order: header, questions, answers,
// authorities, additionals. The `all_*` methods skip any unread remainder
// of earlier sections.
pub struct Parser<'a> {
    msg: &'a [u8],
    off: usize,
    header: HeaderInternal,

    // Remaining entries per section.
    questions: u16,
    answers: u16,
    authorities: u16,
    additionals: u16,
}

impl<'a> Parser<'a> {
    // start parses the header and prepares the parser for the question
    // section.
    pub fn start(msg: &'a [u8]) -> Result<Parser<'a>> {
        let mut header = HeaderInternal::default();
        let off = header.unpack(msg, 0)?;
        let questions = header.questions;
        let answers = header.answers;
        let authorities = header.authorities;
        let additionals = header.additionals;
        Ok(Parser {
            msg,
            off,
            header,
            questions,
            answers,
            authorities,
            additionals,
        })
    }

    pub fn header(&self) -> Header {
        self.header.header()
    }

    // question parses a single question; Err(ErrSectionDone) once the
    // section count is exhausted.
    pub fn question(&mut self) -> Result<Question> {
        if self.questions == 0 {
            return Err(Error::ErrSectionDone);
        }

        let mut name = Name::default();
        let mut off = name.unpack(self.msg, self.off)?;
        let (typ, new_off) = unpack_uint16(self.msg, off)?;
        off = new_off;
        let (class, new_off) = unpack_uint16(self.msg, off)?;
        off = new_off;

        self.off = off;
        self.questions -= 1;

        Ok(Question {
            name,
            typ: DnsType::from(typ),
            class: DnsClass(class & CLASS_MASK),
            unicast_response: class & CLASS_UNICAST_RESPONSE != 0,
        })
    }

    pub fn all_questions(&mut self) -> Result<Vec<Question>> {
        let mut questions = Vec::with_capacity(self.questions as usize);
        loop {
            match self.question() {
                Ok(q) => questions.push(q),
                Err(Error::ErrSectionDone) => return Ok(questions),
                Err(err) => return Err(err),
            }
        }
    }

    pub fn skip_all_questions(&mut self) -> Result<()> {
        while self.questions > 0 {
            let mut off = Name::skip(self.msg, self.off)?;
            off = skip_uint16(self.msg, off)?; // type
            off = skip_uint16(self.msg, off)?; // class
            self.off = off;
            self.questions -= 1;
        }
        Ok(())
    }

    fn remaining(&mut self, sec: Sec) -> &mut u16 {
        match sec {
            Sec::Answers => &mut self.answers,
            Sec::Authorities => &mut self.authorities,
            Sec::Additionals => &mut self.additionals,
        }
    }

    fn resource(&mut self, sec: Sec) -> Result<Resource> {
        if *self.remaining(sec) == 0 {
            return Err(Error::ErrSectionDone);
        }
        let mut resource = Resource::default();
        self.off = resource.unpack(self.msg, self.off)?;
        *self.remaining(sec) -= 1;
        Ok(resource)
    }

    fn all_resources(&mut self, sec: Sec) -> Result<Vec<Resource>> {
        let mut resources = Vec::with_capacity(*self.remaining(sec) as usize);
        loop {
            match self.resource(sec) {
                Ok(r) => resources.push(r),
                Err(Error::ErrSectionDone) => return Ok(resources),
                Err(err) => return Err(err),
            }
        }
    }

    fn skip_resources(&mut self, sec: Sec) -> Result<()> {
        while *self.remaining(sec) > 0 {
            self.off = Resource::skip(self.msg, self.off)?;
            *self.remaining(sec) -= 1;
        }
        Ok(())
    }

    pub fn answer(&mut self) -> Result<Resource> {
        self.skip_all_questions()?;
        self.resource(Sec::Answers)
    }

    pub fn all_answers(&mut self) -> Result<Vec<Resource>> {
        self.skip_all_questions()?;
        self.all_resources(Sec::Answers)
    }

    pub fn all_authorities(&mut self) -> Result<Vec<Resource>> {
        self.skip_all_questions()?;
        self.skip_resources(Sec::Answers)?;
        self.all_resources(Sec::Authorities)
    }

    pub fn all_additionals(&mut self) -> Result<Vec<Resource>> {
        self.skip_all_questions()?;
        self.skip_resources(Sec::Answers)?;
        self.skip_resources(Sec::Authorities)?;
        self.all_resources(Sec::Additionals)
    }
}
